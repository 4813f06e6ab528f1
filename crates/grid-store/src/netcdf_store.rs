//! NetCDF-4 persistence using the native netcdf library.
//!
//! Layout of a written file:
//!
//! - dimensions `time`, `lat`, `lon`
//! - `time(time)`: int, days since 1970-01-01
//! - `lat(lat)`, `lon(lon)`: double, degrees
//! - one packed data variable per product variable, named by its code,
//!   `short` or `ubyte` with `_FillValue`, `scale_factor`, `add_offset`,
//!   `description`, `units` and `sample_encoding` attributes

use std::path::Path;
use std::sync::Once;

use chrono::{Duration, NaiveDate};
use tracing::debug;
use uvr_format::{CalibratedGrid, SampleEncoding, Samples, StorageEncoding, Variable};

use crate::{check_shared_axes, GridStore, StoreError, StoreResult};

const TIME_UNITS: &str = "days since 1970-01-01";
const DIMS: [&str; 3] = ["time", "lat", "lon"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This disables that output by calling
/// H5Eset_auto2 with null handlers. Safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Grid store writing NetCDF-4 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfStore;

impl NetCdfStore {
    pub fn new() -> Self {
        Self
    }
}

impl GridStore for NetCdfStore {
    fn extension(&self) -> &'static str {
        "nc"
    }

    fn write(&self, grids: &[CalibratedGrid], path: &Path) -> StoreResult<()> {
        silence_hdf5_errors();
        let first = check_shared_axes(grids)?;

        let mut file = netcdf::create(path)?;
        file.add_dimension("time", first.times.len())?;
        file.add_dimension("lat", first.lat.len())?;
        file.add_dimension("lon", first.lon.len())?;

        let days: Vec<i32> = first
            .times
            .iter()
            .map(|d| (*d - epoch()).num_days() as i32)
            .collect();
        let mut time = file.add_variable::<i32>("time", &["time"])?;
        time.put_attribute("units", TIME_UNITS)?;
        time.put_attribute("calendar", "standard")?;
        time.put_values(&days, ..)?;

        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_attribute("standard_name", "latitude")?;
        lat.put_values(&first.lat, ..)?;

        let mut lon = file.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_attribute("standard_name", "longitude")?;
        lon.put_values(&first.lon, ..)?;

        for grid in grids {
            let name = grid.variable.code();
            match grid.samples() {
                Samples::I16(data) => {
                    let mut var = file.add_variable::<i16>(name, &DIMS)?;
                    var.set_fill_value(grid.encoding.fill_value() as i16)?;
                    put_data_attributes(&mut var, grid)?;
                    var.put_values(data, ..)?;
                }
                Samples::U8(data) => {
                    let mut var = file.add_variable::<u8>(name, &DIMS)?;
                    var.set_fill_value(grid.encoding.fill_value() as u8)?;
                    put_data_attributes(&mut var, grid)?;
                    var.put_values(data, ..)?;
                }
            }
        }

        debug!(
            path = %path.display(),
            variables = grids.len(),
            times = first.times.len(),
            "Wrote NetCDF dataset"
        );
        Ok(())
    }

    fn read(&self, path: &Path) -> StoreResult<Vec<CalibratedGrid>> {
        silence_hdf5_errors();
        let file = netcdf::open(path)?;

        let days: Vec<i32> = file
            .variable("time")
            .ok_or_else(|| StoreError::MissingData("time variable".to_string()))?
            .get_values(..)?;
        let times: Vec<NaiveDate> = days
            .iter()
            .map(|d| epoch() + Duration::days(*d as i64))
            .collect();
        let lat: Vec<f64> = file
            .variable("lat")
            .ok_or_else(|| StoreError::MissingData("lat variable".to_string()))?
            .get_values(..)?;
        let lon: Vec<f64> = file
            .variable("lon")
            .ok_or_else(|| StoreError::MissingData("lon variable".to_string()))?
            .get_values(..)?;

        let mut grids = Vec::new();
        for var in file.variables() {
            let Some(variable) = Variable::from_code(&var.name()) else {
                continue;
            };
            let sample = get_str_attr(&var, "sample_encoding")
                .and_then(|code| SampleEncoding::from_code(&code))
                .ok_or_else(|| {
                    StoreError::MissingData(format!("sample_encoding of {}", variable.code()))
                })?;
            let encoding = StorageEncoding {
                sample,
                scale_factor: get_f64_attr(&var, "scale_factor").unwrap_or(1.0),
                add_offset: get_f64_attr(&var, "add_offset").unwrap_or(0.0),
            };
            let samples = match sample {
                SampleEncoding::I16Le => Samples::I16(var.get_values(..)?),
                SampleEncoding::U8 => Samples::U8(var.get_values(..)?),
            };

            let mut grid = CalibratedGrid::new(
                variable,
                times.clone(),
                lat.clone(),
                lon.clone(),
                encoding,
                samples,
            )?;
            grid.parameter = get_str_attr(&var, "parameter");
            grid.source_name = get_str_attr(&var, "source_name");
            grids.push(grid);
        }

        if grids.is_empty() {
            return Err(StoreError::MissingData(format!(
                "no product variables in {}",
                path.display()
            )));
        }
        Ok(grids)
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch")
}

fn put_data_attributes(var: &mut netcdf::VariableMut<'_>, grid: &CalibratedGrid) -> StoreResult<()> {
    var.put_attribute("description", grid.description())?;
    var.put_attribute("units", grid.unit())?;
    var.put_attribute("scale_factor", grid.encoding.scale_factor)?;
    var.put_attribute("add_offset", grid.encoding.add_offset)?;
    var.put_attribute("sample_encoding", grid.encoding.sample.code())?;
    if let Some(parameter) = &grid.parameter {
        var.put_attribute("parameter", parameter.as_str())?;
    }
    if let Some(source_name) = &grid.source_name {
        var.put_attribute("source_name", source_name.as_str())?;
    }
    Ok(())
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get a string attribute.
fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
