//! Parsing of the fixed-layout 44-character product filename.
//!
//! Example: `MOD02SSH_A20191105Av1_v811_7200_3601_uvb__le`
//!
//! | range    | field                          |
//! |----------|--------------------------------|
//! | `0..3`   | instrument                     |
//! | `10..18` | start date (`YYYYMMDD`)        |
//! | `18..21` | averaging period               |
//! | `27..31` | pixel count                    |
//! | `32..36` | line count                     |
//! | `37..41` | variable (underscore padded)   |
//! | `42..44` | sample encoding                |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{NameError, NameResult};
use crate::tables::{Average, Instrument, SampleEncoding, Variable};

/// Length of every product filename.
pub const NAME_LEN: usize = 44;

/// Suffix marking a gzip-compressed product on the remote side.
pub const GZIP_SUFFIX: &str = ".gz";

/// Metadata encoded in a product filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub instrument: Instrument,
    pub start_date: NaiveDate,
    pub average: Average,
    /// Grid width
    pub pixel_count: usize,
    /// Grid height
    pub line_count: usize,
    pub variable: Variable,
    pub encoding: SampleEncoding,
}

impl ProductMetadata {
    /// Stem of the per-day output file: `<YYYYMMDD>_<variable>`.
    pub fn output_stem(&self) -> String {
        format!(
            "{}_{}",
            self.start_date.format("%Y%m%d"),
            self.variable.code()
        )
    }
}

/// Parse a product filename.
pub fn parse(name: &str) -> NameResult<ProductMetadata> {
    // Byte ranges below are only valid on ASCII input.
    if name.len() != NAME_LEN || !name.is_ascii() {
        return Err(NameError::MalformedName {
            name: name.to_string(),
            expected: NAME_LEN,
            actual: name.chars().count(),
        });
    }

    let inst = &name[0..3];
    let instrument = Instrument::from_code(inst).ok_or_else(|| NameError::UnknownInstrument {
        value: inst.to_string(),
        name: name.to_string(),
    })?;

    let date = &name[10..18];
    let start_date =
        NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| NameError::BadDate {
            value: date.to_string(),
            name: name.to_string(),
        })?;

    let avg = &name[18..21];
    let average = Average::from_code(avg).ok_or_else(|| NameError::UnknownAverage {
        value: avg.to_string(),
        name: name.to_string(),
    })?;

    let pixel = &name[27..31];
    let pixel_count = parse_count(pixel).ok_or_else(|| NameError::BadPixelCount {
        value: pixel.to_string(),
        name: name.to_string(),
    })?;

    let line = &name[32..36];
    let line_count = parse_count(line).ok_or_else(|| NameError::BadLineCount {
        value: line.to_string(),
        name: name.to_string(),
    })?;

    let var = name[37..41].replace('_', "");
    let variable = Variable::from_code(&var).ok_or_else(|| NameError::UnknownVariable {
        value: var.clone(),
        name: name.to_string(),
    })?;

    let dt = &name[42..44];
    let encoding = SampleEncoding::from_code(dt).ok_or_else(|| NameError::UnknownEncoding {
        value: dt.to_string(),
        name: name.to_string(),
    })?;

    Ok(ProductMetadata {
        instrument,
        start_date,
        average,
        pixel_count,
        line_count,
        variable,
        encoding,
    })
}

/// Strip the compression suffix from a remote name, if present.
pub fn strip_compression(name: &str) -> (&str, bool) {
    match name.strip_suffix(GZIP_SUFFIX) {
        Some(stem) => (stem, true),
        None => (name, false),
    }
}

/// Parse the name of a remote file, which may carry a `.gz` suffix.
pub fn parse_remote_name(name: &str) -> NameResult<ProductMetadata> {
    parse(strip_compression(name).0)
}

fn parse_count(field: &str) -> Option<usize> {
    field.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
