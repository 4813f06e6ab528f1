//! Calibrated, masked, georeferenced grids.
//!
//! A [`CalibratedGrid`] keeps the packed raw samples of a product together
//! with the linear calibration that turns them into physical values. Keeping
//! the packed form halves (or quarters) memory compared to holding `f64`
//! values, matters when a month of global grids is stacked, and lets a store
//! re-serialize the data with its original encoding.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::tables::{SampleEncoding, Variable};

/// Packed raw samples in `(time, lat, lon)` row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Samples {
    I16(Vec<i16>),
    U8(Vec<u8>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::I16(v) => v.len(),
            Samples::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encoding(&self) -> SampleEncoding {
        match self {
            Samples::I16(_) => SampleEncoding::I16Le,
            Samples::U8(_) => SampleEncoding::U8,
        }
    }

    /// Raw sample at a flat index, widened to `i32`.
    #[inline]
    pub fn raw(&self, index: usize) -> i32 {
        match self {
            Samples::I16(v) => v[index] as i32,
            Samples::U8(v) => v[index] as i32,
        }
    }

    fn append(&mut self, other: Samples) {
        match (self, other) {
            (Samples::I16(a), Samples::I16(b)) => a.extend(b),
            (Samples::U8(a), Samples::U8(b)) => a.extend(b),
            // Callers check encodings before appending.
            _ => unreachable!("sample encodings differ"),
        }
    }

    fn map_raw(&mut self, f: impl Fn(i32) -> i32) {
        match self {
            Samples::I16(v) => v.iter_mut().for_each(|s| *s = f(*s as i32) as i16),
            Samples::U8(v) => v.iter_mut().for_each(|s| *s = f(*s as i32) as u8),
        }
    }
}

/// Storage encoding carried alongside the data so it can be written back
/// with the same packing (`_FillValue`, `scale_factor`, `add_offset`, width).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageEncoding {
    pub sample: SampleEncoding,
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl StorageEncoding {
    pub fn fill_value(&self) -> i32 {
        self.sample.fill_value()
    }

    pub fn width(&self) -> usize {
        self.sample.width()
    }

    /// Physical value of a raw sample; `None` for the fill value.
    #[inline]
    pub fn unpack(&self, raw: i32) -> Option<f64> {
        if raw == self.fill_value() {
            None
        } else {
            Some(self.add_offset + self.scale_factor * raw as f64)
        }
    }

    /// Nearest raw sample for a physical value, never colliding with the fill value.
    pub fn pack(&self, value: f64) -> i32 {
        let (lo, hi) = self.sample.raw_range();
        let raw = if self.scale_factor == 0.0 {
            0
        } else {
            ((value - self.add_offset) / self.scale_factor).round() as i64
        };
        let raw = raw.clamp(lo as i64, hi as i64) as i32;
        if raw != self.fill_value() {
            raw
        } else if raw > lo {
            raw - 1
        } else {
            raw + 1
        }
    }
}

/// Aggregates over the valid cells of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridStatistics {
    pub valid: usize,
    pub masked: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// A `(time, lat, lon)` grid of calibrated values with a validity mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedGrid {
    pub variable: Variable,
    /// One acquisition date per time slice, ascending.
    pub times: Vec<NaiveDate>,
    /// Latitude of each row, descending.
    pub lat: Vec<f64>,
    /// Longitude of each column, ascending.
    pub lon: Vec<f64>,
    pub encoding: StorageEncoding,
    /// Parameter name recorded in the record header.
    pub parameter: Option<String>,
    /// Output name suggested by the record header.
    pub source_name: Option<String>,
    samples: Samples,
}

impl CalibratedGrid {
    /// Assemble a grid, checking that the sample buffer matches the axes.
    pub fn new(
        variable: Variable,
        times: Vec<NaiveDate>,
        lat: Vec<f64>,
        lon: Vec<f64>,
        encoding: StorageEncoding,
        samples: Samples,
    ) -> Result<Self, GridError> {
        let shape = [times.len(), lat.len(), lon.len()];
        if samples.len() != shape.iter().product::<usize>() {
            return Err(GridError::ShapeMismatch {
                shape,
                actual: samples.len(),
            });
        }
        if samples.encoding() != encoding.sample {
            return Err(GridError::EncodingMismatch {
                expected: encoding.sample.code().to_string(),
                found: samples.encoding().code().to_string(),
            });
        }
        Ok(Self {
            variable,
            times,
            lat,
            lon,
            encoding,
            parameter: None,
            source_name: None,
            samples,
        })
    }

    /// `[time, lat, lon]`
    pub fn shape(&self) -> [usize; 3] {
        [self.times.len(), self.lat.len(), self.lon.len()]
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn description(&self) -> &'static str {
        self.variable.description()
    }

    pub fn unit(&self) -> &'static str {
        self.variable.unit()
    }

    #[inline]
    fn index(&self, t: usize, row: usize, col: usize) -> usize {
        (t * self.lat.len() + row) * self.lon.len() + col
    }

    /// Raw packed sample at a cell.
    pub fn raw(&self, t: usize, row: usize, col: usize) -> i32 {
        self.samples.raw(self.index(t, row, col))
    }

    pub fn is_valid(&self, t: usize, row: usize, col: usize) -> bool {
        self.raw(t, row, col) != self.encoding.fill_value()
    }

    /// Physical value at a cell, `None` where masked.
    pub fn value(&self, t: usize, row: usize, col: usize) -> Option<f64> {
        self.encoding.unpack(self.raw(t, row, col))
    }

    /// Physical values of every cell in row-major order.
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        (0..self.samples.len()).map(move |i| self.encoding.unpack(self.samples.raw(i)))
    }

    /// Validity flags in row-major order (`true` = valid).
    pub fn mask(&self) -> Vec<bool> {
        let fill = self.encoding.fill_value();
        (0..self.samples.len())
            .map(|i| self.samples.raw(i) != fill)
            .collect()
    }

    /// Count, extrema and mean of the valid cells.
    pub fn statistics(&self) -> GridStatistics {
        let mut stats = GridStatistics::default();
        let mut sum = 0.0;
        for value in self.values() {
            match value {
                Some(v) => {
                    stats.valid += 1;
                    sum += v;
                    stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
                    stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
                }
                None => stats.masked += 1,
            }
        }
        if stats.valid > 0 {
            stats.mean = Some(sum / stats.valid as f64);
        }
        stats
    }

    /// Stack grids of one variable along the time axis, ordered by date.
    ///
    /// All grids must share the variable, the spatial axes and the sample
    /// encoding. Slices whose calibration differs from the earliest grid are
    /// repacked into the earliest grid's calibration.
    pub fn concat_time(mut grids: Vec<CalibratedGrid>) -> Result<CalibratedGrid, GridError> {
        grids.sort_by_key(|g| g.times.first().copied());
        let mut iter = grids.into_iter();
        let mut merged = iter.next().ok_or(GridError::Empty)?;

        for mut grid in iter {
            if grid.variable != merged.variable {
                return Err(GridError::VariableMismatch {
                    expected: merged.variable.code().to_string(),
                    found: grid.variable.code().to_string(),
                });
            }
            if grid.lat != merged.lat {
                return Err(GridError::CoordinateMismatch { axis: "lat" });
            }
            if grid.lon != merged.lon {
                return Err(GridError::CoordinateMismatch { axis: "lon" });
            }
            if grid.encoding.sample != merged.encoding.sample {
                return Err(GridError::EncodingMismatch {
                    expected: merged.encoding.sample.code().to_string(),
                    found: grid.encoding.sample.code().to_string(),
                });
            }
            if grid.encoding != merged.encoding {
                let from = grid.encoding;
                let to = merged.encoding;
                tracing::debug!(
                    variable = merged.variable.code(),
                    from_scale = from.scale_factor,
                    from_offset = from.add_offset,
                    "Repacking slice with differing calibration"
                );
                grid.samples.map_raw(|raw| match from.unpack(raw) {
                    Some(v) => to.pack(v),
                    None => to.fill_value(),
                });
            }
            merged.times.extend(grid.times);
            merged.samples.append(grid.samples);
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(scale: f64, offset: f64) -> StorageEncoding {
        StorageEncoding {
            sample: SampleEncoding::I16Le,
            scale_factor: scale,
            add_offset: offset,
        }
    }

    fn grid(day: u32, raw: Vec<i16>, enc: StorageEncoding) -> CalibratedGrid {
        CalibratedGrid::new(
            Variable::Uva,
            vec![NaiveDate::from_ymd_opt(2019, 11, day).unwrap()],
            vec![10.0, 9.0],
            vec![0.0, 1.0],
            enc,
            Samples::I16(raw),
        )
        .unwrap()
    }

    #[test]
    fn test_shape_checked() {
        let err = CalibratedGrid::new(
            Variable::Uva,
            vec![NaiveDate::from_ymd_opt(2019, 11, 1).unwrap()],
            vec![10.0, 9.0],
            vec![0.0, 1.0],
            encoding(1.0, 0.0),
            Samples::I16(vec![1, 2, 3]),
        )
        .unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch { actual: 3, .. }));
    }

    #[test]
    fn test_values_and_mask() {
        let g = grid(1, vec![50, -1, 0, 10], encoding(0.1, 2.0));
        let values: Vec<_> = g.values().collect();
        assert_eq!(values[1], None);
        assert!((values[0].unwrap() - 7.0).abs() < 1e-12);
        assert_eq!(g.mask(), vec![true, false, true, true]);
        assert!(!g.is_valid(0, 0, 1));
    }

    #[test]
    fn test_statistics_skip_masked() {
        let g = grid(1, vec![10, -1, 20, -1], encoding(1.0, 0.0));
        let stats = g.statistics();
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.masked, 2);
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(20.0));
        assert_eq!(stats.mean, Some(15.0));
    }

    #[test]
    fn test_statistics_all_masked() {
        let g = grid(1, vec![-1; 4], encoding(1.0, 0.0));
        let stats = g.statistics();
        assert_eq!(stats.valid, 0);
        assert_eq!(stats.mean, None);
    }

    #[test]
    fn test_concat_orders_by_date() {
        let enc = encoding(1.0, 0.0);
        let merged =
            CalibratedGrid::concat_time(vec![grid(2, vec![5; 4], enc), grid(1, vec![1; 4], enc)])
                .unwrap();
        assert_eq!(merged.shape(), [2, 2, 2]);
        assert_eq!(merged.times[0], NaiveDate::from_ymd_opt(2019, 11, 1).unwrap());
        assert_eq!(merged.raw(0, 0, 0), 1);
        assert_eq!(merged.raw(1, 1, 1), 5);
    }

    #[test]
    fn test_concat_repacks_calibration() {
        let first = grid(1, vec![10, 10, 10, 10], encoding(1.0, 0.0));
        let second = grid(2, vec![10, -1, 10, 10], encoding(2.0, 0.0));
        let merged = CalibratedGrid::concat_time(vec![first, second]).unwrap();
        assert_eq!(merged.value(1, 0, 0), Some(20.0));
        assert_eq!(merged.value(1, 0, 1), None);
    }

    #[test]
    fn test_concat_rejects_mismatch() {
        let enc = encoding(1.0, 0.0);
        let mut other = grid(2, vec![0; 4], enc);
        other.lon = vec![0.0, 2.0];
        let err = CalibratedGrid::concat_time(vec![grid(1, vec![0; 4], enc), other]).unwrap_err();
        assert_eq!(err, GridError::CoordinateMismatch { axis: "lon" });

        let mut other = grid(2, vec![0; 4], enc);
        other.variable = Variable::Uvb;
        let err = CalibratedGrid::concat_time(vec![grid(1, vec![0; 4], enc), other]).unwrap_err();
        assert!(matches!(err, GridError::VariableMismatch { .. }));

        assert_eq!(CalibratedGrid::concat_time(Vec::new()).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn test_pack_avoids_fill() {
        let enc = encoding(1.0, 0.0);
        assert_eq!(enc.pack(-1.0), -2);
        assert_eq!(enc.pack(3.4), 3);
        assert_eq!(enc.pack(1e9), i16::MAX as i32);

        let enc = StorageEncoding {
            sample: SampleEncoding::U8,
            scale_factor: 1.0,
            add_offset: 0.0,
        };
        assert_eq!(enc.pack(255.0), 254);
        assert_eq!(enc.pack(-3.0), 0);
    }
}
