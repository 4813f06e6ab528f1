//! NetCDF write/read round trips.
//!
//! Requires the `netcdf` feature (and libnetcdf on the system):
//! `cargo test -p grid-store --features netcdf`

#![cfg(feature = "netcdf")]

use grid_store::{GridStore, NetCdfStore};
use test_utils::{daily_filename, i16_record, product_filename, ramp_samples, u8_record, RecordSpec};
use uvr_format::{decode_named, CalibratedGrid};

fn decoded(date: &str, variable: &str) -> CalibratedGrid {
    let spec = RecordSpec::default();
    let mut samples = ramp_samples(spec.pixels, spec.lines);
    samples[5] = -1;
    decode_named(&daily_filename(date, variable), &i16_record(&spec, &samples)).unwrap()
}

#[test]
fn test_daily_grid_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("20191105_uvb.nc");
    let store = NetCdfStore::new();
    let grid = decoded("20191105", "uvb");

    store.write(std::slice::from_ref(&grid), &path).unwrap();
    let read = store.read(&path).unwrap();

    assert_eq!(read.len(), 1);
    assert_eq!(read[0], grid);
}

#[test]
fn test_u8_grid_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("20191105_par.nc");
    let spec = RecordSpec::default();
    let mut samples = vec![17u8; spec.pixels * spec.lines];
    samples[0] = 255;
    let name = product_filename("SWF", "20191105", "Av1", spec.pixels, spec.lines, "par", "8b");
    let grid = decode_named(&name, &u8_record(&spec, &samples)).unwrap();

    let store = NetCdfStore::new();
    store.write(std::slice::from_ref(&grid), &path).unwrap();
    let read = store.read(&path).unwrap();
    assert_eq!(read[0].samples(), grid.samples());
    assert_eq!(read[0].statistics(), grid.statistics());
}

#[test]
fn test_monthly_multi_variable_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("201911.nc");
    let uva = CalibratedGrid::concat_time(vec![decoded("20191101", "uva"), decoded("20191102", "uva")]).unwrap();
    let uvb = CalibratedGrid::concat_time(vec![decoded("20191102", "uvb"), decoded("20191101", "uvb")]).unwrap();

    let store = NetCdfStore::new();
    store.write(&[uva.clone(), uvb.clone()], &path).unwrap();
    let mut read = store.read(&path).unwrap();
    read.sort_by_key(|g| g.variable);

    assert_eq!(read, vec![uva, uvb]);
    assert_eq!(read[0].shape()[0], 2);
}
