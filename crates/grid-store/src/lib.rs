//! Persistence of calibrated grids.
//!
//! The fetcher treats the on-disk container as an opaque labeled
//! N-dimensional dataset: it hands grids to a [`GridStore`] and reads them
//! back for merging, without knowing the container format.
//!
//! # Implementations
//!
//! - [`NetCdfStore`] (feature `netcdf`): NetCDF-4 files that keep the packed
//!   sample encoding (`_FillValue`, `scale_factor`, `add_offset`) so that
//!   reading the file back with any CF-aware tool yields the calibrated,
//!   masked values.

use std::path::Path;

use thiserror::Error;
use uvr_format::{CalibratedGrid, GridError};

#[cfg(feature = "netcdf")]
mod netcdf_store;

#[cfg(feature = "netcdf")]
pub use netcdf_store::{silence_hdf5_errors, NetCdfStore};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Grids read back do not form a valid grid
    #[error(transparent)]
    Grid(#[from] GridError),

    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] ::netcdf::Error),
}

/// Sink and source for calibrated grids.
///
/// Implementations are blocking; async callers run them on the blocking
/// pool.
pub trait GridStore: Send + Sync {
    /// File extension (without the dot) of files written by this store.
    fn extension(&self) -> &'static str;

    /// Write one dataset holding `grids`, which must share their time,
    /// latitude and longitude axes.
    fn write(&self, grids: &[CalibratedGrid], path: &Path) -> StoreResult<()>;

    /// Read back every grid stored in a dataset.
    fn read(&self, path: &Path) -> StoreResult<Vec<CalibratedGrid>>;
}

/// Check that grids written into one dataset share their axes.
pub fn check_shared_axes(grids: &[CalibratedGrid]) -> StoreResult<&CalibratedGrid> {
    let first = grids
        .first()
        .ok_or_else(|| StoreError::MissingData("no grids to write".to_string()))?;
    for grid in &grids[1..] {
        if grid.times != first.times {
            return Err(StoreError::InvalidFormat(format!(
                "time axis of {} differs from {}",
                grid.variable.code(),
                first.variable.code()
            )));
        }
        if grid.lat != first.lat || grid.lon != first.lon {
            return Err(StoreError::InvalidFormat(format!(
                "spatial axes of {} differ from {}",
                grid.variable.code(),
                first.variable.code()
            )));
        }
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uvr_format::{Samples, SampleEncoding, StorageEncoding, Variable};

    fn grid(variable: Variable, lon: Vec<f64>) -> CalibratedGrid {
        let n = lon.len();
        CalibratedGrid::new(
            variable,
            vec![NaiveDate::from_ymd_opt(2019, 11, 1).unwrap()],
            vec![0.0],
            lon,
            StorageEncoding {
                sample: SampleEncoding::U8,
                scale_factor: 1.0,
                add_offset: 0.0,
            },
            Samples::U8(vec![0; n]),
        )
        .unwrap()
    }

    #[test]
    fn test_shared_axes_ok() {
        let grids = vec![grid(Variable::Uva, vec![0.0, 1.0]), grid(Variable::Uvb, vec![0.0, 1.0])];
        assert_eq!(check_shared_axes(&grids).unwrap().variable, Variable::Uva);
    }

    #[test]
    fn test_shared_axes_mismatch() {
        let grids = vec![grid(Variable::Uva, vec![0.0, 1.0]), grid(Variable::Uvb, vec![0.0, 2.0])];
        assert!(matches!(check_shared_axes(&grids), Err(StoreError::InvalidFormat(_))));
        assert!(matches!(check_shared_axes(&[]), Err(StoreError::MissingData(_))));
    }
}
