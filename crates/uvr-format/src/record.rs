//! Decoding of the binary record that follows the product filename layout.
//!
//! A record is a header block followed by `line_count * pixel_count` raw
//! samples. The header block is as long as one row of samples
//! (`pixel_count * sample_width` bytes) and starts with ASCII fields at fixed
//! character offsets:
//!
//! | range      | field                 |
//! |------------|-----------------------|
//! | `0..6`     | pixel count           |
//! | `6..12`    | line count            |
//! | `12..20`   | minimum longitude     |
//! | `20..28`   | maximum latitude      |
//! | `28..36`   | resolution (degrees)  |
//! | `36..48`   | calibration slope     |
//! | `48..60`   | calibration offset    |
//! | `61..69`   | parameter name        |
//! | `70..110`  | suggested output name |
//!
//! Rows are stored top row first and are flipped on read.

use std::ops::Range;

use tracing::debug;

use crate::error::{DecodeError, DecodeResult};
use crate::filename::{self, ProductMetadata};
use crate::grid::{CalibratedGrid, Samples, StorageEncoding};
use crate::tables::SampleEncoding;

const PIXELS: Range<usize> = 0..6;
const LINES: Range<usize> = 6..12;
const LON_MIN: Range<usize> = 12..20;
const LAT_MAX: Range<usize> = 20..28;
const RESOLUTION: Range<usize> = 28..36;
const SLOPE: Range<usize> = 36..48;
const OFFSET: Range<usize> = 48..60;
const PARAMETER: Range<usize> = 61..69;
const OUTPUT_NAME: Range<usize> = 70..110;

/// Parsed record header.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    pub pixel_count: usize,
    pub line_count: usize,
    pub lon_min: f64,
    pub lat_max: f64,
    /// Degrees per cell along both axes
    pub resolution: f64,
    pub slope: f64,
    pub offset: f64,
    pub parameter: Option<String>,
    pub output_name: Option<String>,
}

impl RecordHeader {
    /// Parse the ASCII fields of a header block.
    pub fn parse(block: &[u8]) -> DecodeResult<Self> {
        let header = Self {
            pixel_count: int_field(block, "pixel_count", PIXELS)?,
            line_count: int_field(block, "line_count", LINES)?,
            lon_min: float_field(block, "lon_min", LON_MIN)?,
            lat_max: float_field(block, "lat_max", LAT_MAX)?,
            resolution: float_field(block, "resolution", RESOLUTION)?,
            slope: float_field(block, "slope", SLOPE)?,
            offset: float_field(block, "offset", OFFSET)?,
            parameter: text_field(block, PARAMETER),
            output_name: text_field(block, OUTPUT_NAME),
        };

        if header.resolution <= 0.0 {
            return Err(DecodeError::CorruptHeader {
                field: "resolution",
                reason: format!("resolution must be positive, got {}", header.resolution),
            });
        }
        Ok(header)
    }
}

/// Length of the header block for a product.
///
/// The format sizes the header as one row of samples.
pub fn header_len(meta: &ProductMetadata) -> usize {
    meta.pixel_count * meta.encoding.width()
}

/// Parse only the header of a record.
pub fn read_header(meta: &ProductMetadata, raw: &[u8]) -> DecodeResult<RecordHeader> {
    let len = header_len(meta);
    let block = raw.get(..len).ok_or_else(|| DecodeError::CorruptHeader {
        field: "header",
        reason: format!("record has {} bytes, header block needs {}", raw.len(), len),
    })?;
    RecordHeader::parse(block)
}

/// Decode a record into a calibrated grid with a single time slice.
pub fn decode(meta: &ProductMetadata, raw: &[u8]) -> DecodeResult<CalibratedGrid> {
    let header = read_header(meta, raw)?;

    if header.pixel_count != meta.pixel_count || header.line_count != meta.line_count {
        return Err(DecodeError::InconsistentDimensions {
            header_pixels: header.pixel_count,
            header_lines: header.line_count,
            name_pixels: meta.pixel_count,
            name_lines: meta.line_count,
        });
    }

    let pixels = meta.pixel_count;
    let lines = meta.line_count;
    let body = &raw[header_len(meta)..];
    let expected = lines * pixels * meta.encoding.width();
    if body.len() != expected {
        return Err(DecodeError::TruncatedBody {
            expected,
            actual: body.len(),
        });
    }

    let samples = flip_rows(body, pixels, lines, meta.encoding);

    let lat = (0..lines)
        .map(|i| header.lat_max - i as f64 * header.resolution)
        .collect();
    let lon = (0..pixels)
        .map(|j| header.lon_min + j as f64 * header.resolution)
        .collect();

    let encoding = StorageEncoding {
        sample: meta.encoding,
        scale_factor: header.slope,
        add_offset: header.offset,
    };

    let mut grid = CalibratedGrid::new(
        meta.variable,
        vec![meta.start_date],
        lat,
        lon,
        encoding,
        samples,
    )?;
    grid.parameter = header.parameter;
    grid.source_name = header.output_name;

    debug!(
        variable = meta.variable.code(),
        date = %meta.start_date,
        pixels,
        lines,
        slope = header.slope,
        offset = header.offset,
        "Decoded record"
    );

    Ok(grid)
}

/// Decode a record given its (uncompressed) product filename.
pub fn decode_named(name: &str, raw: &[u8]) -> DecodeResult<CalibratedGrid> {
    let meta = filename::parse(name)?;
    decode(&meta, raw)
}

/// Read row-major samples, emitting the last on-disk row first.
fn flip_rows(body: &[u8], pixels: usize, lines: usize, encoding: SampleEncoding) -> Samples {
    let row_bytes = pixels * encoding.width();
    let rows = (0..lines)
        .rev()
        .map(|row| &body[row * row_bytes..(row + 1) * row_bytes]);

    match encoding {
        SampleEncoding::I16Le => {
            let mut out = Vec::with_capacity(pixels * lines);
            for row in rows {
                out.extend(
                    row.chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]])),
                );
            }
            Samples::I16(out)
        }
        SampleEncoding::U8 => {
            let mut out = Vec::with_capacity(pixels * lines);
            for row in rows {
                out.extend_from_slice(row);
            }
            Samples::U8(out)
        }
    }
}

fn ascii_field<'a>(block: &'a [u8], field: &'static str, range: Range<usize>) -> DecodeResult<&'a str> {
    let bytes = block.get(range.clone()).ok_or_else(|| DecodeError::CorruptHeader {
        field,
        reason: format!(
            "header block of {} bytes does not contain {:?}",
            block.len(),
            range
        ),
    })?;
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::CorruptHeader {
        field,
        reason: "field is not ASCII".to_string(),
    })?;
    Ok(text.trim_matches(|c: char| c.is_whitespace() || c == '\0'))
}

fn int_field(block: &[u8], field: &'static str, range: Range<usize>) -> DecodeResult<usize> {
    let text = ascii_field(block, field, range)?;
    text.parse::<usize>()
        .map_err(|e| DecodeError::CorruptHeader {
            field,
            reason: format!("{text:?}: {e}"),
        })
}

fn float_field(block: &[u8], field: &'static str, range: Range<usize>) -> DecodeResult<f64> {
    let text = ascii_field(block, field, range)?;
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(v) => Err(DecodeError::CorruptHeader {
            field,
            reason: format!("{text:?} is not finite ({v})"),
        }),
        Err(e) => Err(DecodeError::CorruptHeader {
            field,
            reason: format!("{text:?}: {e}"),
        }),
    }
}

/// Optional text field, clamped to the header block.
fn text_field(block: &[u8], range: Range<usize>) -> Option<String> {
    let end = range.end.min(block.len());
    let bytes = block.get(range.start..end)?;
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!text.is_empty()).then(|| text.to_string())
}
