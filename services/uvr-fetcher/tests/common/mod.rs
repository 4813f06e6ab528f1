//! Shared fixtures for pipeline tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use grid_store::{check_shared_axes, GridStore, StoreError, StoreResult};
use test_utils::{daily_filename, gzip, i16_record, ramp_samples, FixtureTree, RecordSpec};
use uvr_fetcher::remote::RemoteResult;
use uvr_fetcher::{FetchConfig, LocalSource, Pipeline, RemoteSource};
use uvr_format::CalibratedGrid;

/// Grid store writing JSON, so pipeline tests need no libnetcdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStore;

impl GridStore for JsonStore {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, grids: &[CalibratedGrid], path: &Path) -> StoreResult<()> {
        check_shared_axes(grids)?;
        let data = serde_json::to_vec(grids).map_err(|e| StoreError::InvalidFormat(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    fn read(&self, path: &Path) -> StoreResult<Vec<CalibratedGrid>> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| StoreError::InvalidFormat(e.to_string()))
    }
}

/// `file://` source that counts transfers.
#[derive(Debug, Default)]
pub struct CountingSource {
    inner: LocalSource,
    fetches: AtomicUsize,
    lists: AtomicUsize,
}

impl CountingSource {
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for CountingSource {
    async fn list(&self, dir: &str) -> RemoteResult<Vec<String>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(dir).await
    }

    async fn fetch(&self, path: &str) -> RemoteResult<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(path).await
    }
}

/// Gzipped daily record for `date` (`YYYYMMDD`) and `variable`.
pub fn daily_product(date: &str, variable: &str) -> (String, Vec<u8>) {
    let spec = RecordSpec::default();
    let record = i16_record(&spec, &ramp_samples(spec.pixels, spec.lines));
    (format!("{}.gz", daily_filename(date, variable)), gzip(&record))
}

/// Archive tree holding `days` daily files of `variable` for one month,
/// laid out as `<variable>/daily/<YYYYMM>/<name>.gz`.
pub fn add_month(tree: &FixtureTree, year: i32, month: u32, variable: &str, days: impl IntoIterator<Item = u32>) {
    for day in days {
        let date = format!("{year:04}{month:02}{day:02}");
        let (name, data) = daily_product(&date, variable);
        tree.add(&format!("{variable}/daily/{year:04}{month:02}/{name}"), data)
            .unwrap();
    }
}

/// Run configuration against a fixture tree.
pub fn fixture_config(tree: &FixtureTree, output: &Path, year: i32, month: u32) -> FetchConfig {
    let mut config = FetchConfig::new(year, month, output);
    config.base_url = format!("{}/uv[a-b]/daily", tree.url());
    config.workers = 3;
    config.queue_capacity = 4;
    config
}

pub fn pipeline(config: FetchConfig, source: Arc<CountingSource>) -> Pipeline {
    Pipeline::new(config, source, Arc::new(JsonStore))
}
