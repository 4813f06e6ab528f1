//! Generators for synthetic JASMES product records.
//!
//! These build byte-exact records (ASCII header block + raw samples) and
//! product filenames so decoder and pipeline tests need no real archive
//! data.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Header values written into a synthetic record.
#[derive(Debug, Clone)]
pub struct RecordSpec {
    pub pixels: usize,
    pub lines: usize,
    pub lon_min: f64,
    pub lat_max: f64,
    pub resolution: f64,
    pub slope: f64,
    pub offset: f64,
    pub parameter: String,
    pub output_name: String,
}

impl Default for RecordSpec {
    /// A small 64x4 grid; 64 pixels keep the header block long enough for
    /// every header field in both encodings.
    fn default() -> Self {
        Self {
            pixels: 64,
            lines: 4,
            lon_min: -180.0,
            lat_max: 90.0,
            resolution: 0.05,
            slope: 0.1,
            offset: 2.0,
            parameter: "UVB".to_string(),
            output_name: "uvb_daily.dat".to_string(),
        }
    }
}

impl RecordSpec {
    pub fn with_size(pixels: usize, lines: usize) -> Self {
        Self {
            pixels,
            lines,
            ..Default::default()
        }
    }

    /// The ASCII header padded (or cut) to `len` bytes.
    pub fn header(&self, len: usize) -> Vec<u8> {
        let mut text = format!(
            "{:>6}{:>6}{:>8}{:>8}{:>8}{:>12}{:>12} {:<8} {:<40}",
            self.pixels,
            self.lines,
            format_fixed(self.lon_min, 8),
            format_fixed(self.lat_max, 8),
            format_fixed(self.resolution, 8),
            format_fixed(self.slope, 12),
            format_fixed(self.offset, 12),
            self.parameter,
            self.output_name,
        )
        .into_bytes();
        text.resize(len, b' ');
        text
    }
}

/// Format a float so it fits a fixed-width header field.
fn format_fixed(value: f64, width: usize) -> String {
    let text = value.to_string();
    if text.len() <= width {
        text
    } else {
        format!("{:.*e}", width.saturating_sub(6), value)
    }
}

/// Build a signed 16-bit record; `samples` are in on-disk order (top row first).
pub fn i16_record(spec: &RecordSpec, samples: &[i16]) -> Vec<u8> {
    assert_eq!(samples.len(), spec.pixels * spec.lines, "sample count");
    let mut data = spec.header(spec.pixels * 2);
    for s in samples {
        data.extend_from_slice(&s.to_le_bytes());
    }
    data
}

/// Build an unsigned 8-bit record; `samples` are in on-disk order (top row first).
pub fn u8_record(spec: &RecordSpec, samples: &[u8]) -> Vec<u8> {
    assert_eq!(samples.len(), spec.pixels * spec.lines, "sample count");
    let mut data = spec.header(spec.pixels);
    data.extend_from_slice(samples);
    data
}

/// Creates on-disk samples with predictable values.
///
/// Each sample is `row * 100 + col`, so a test can tell which on-disk row a
/// decoded row came from.
pub fn ramp_samples(pixels: usize, lines: usize) -> Vec<i16> {
    let mut data = Vec::with_capacity(pixels * lines);
    for row in 0..lines {
        for col in 0..pixels {
            data.push((row * 100 + col) as i16);
        }
    }
    data
}

/// Build a 44-character product filename from its fields.
///
/// `date` is `YYYYMMDD`; `variable` is padded with underscores to four
/// characters as in the archive.
pub fn product_filename(
    instrument: &str,
    date: &str,
    average: &str,
    pixels: usize,
    lines: usize,
    variable: &str,
    encoding: &str,
) -> String {
    format!(
        "{instrument}02SSH_A{date}{average}_v811_{pixels:04}_{lines:04}_{variable:_<4}_{encoding}"
    )
}

/// A daily Terra MODIS filename for the default record size.
pub fn daily_filename(date: &str, variable: &str) -> String {
    let spec = RecordSpec::default();
    product_filename("MOD", date, "Av1", spec.pixels, spec.lines, variable, "le")
}

/// Gzip-compress a buffer.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}
