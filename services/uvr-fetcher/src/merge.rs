//! Monthly completeness check and merge.
//!
//! Per-day datasets are named `<YYYYMMDD>_<variable>.<ext>`. Once every
//! variable present in the month directory has one dataset per calendar
//! day, they are concatenated along time into `<YYYYMM>.<ext>` and the
//! per-day files are removed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use grid_store::GridStore;
use tracing::{debug, info, warn};
use uvr_format::CalibratedGrid;

use crate::download::partial_path;
use crate::error::FetchResult;

/// Number of days in a month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 0,
    }
}

/// Per-day datasets found in a month directory, grouped by variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthInventory {
    pub year: i32,
    pub month: u32,
    pub days: BTreeMap<String, BTreeMap<NaiveDate, PathBuf>>,
}

impl MonthInventory {
    /// Scan `dir` for per-day datasets of the given month.
    ///
    /// Files with another extension, `.partial` leftovers and names that
    /// do not follow `<YYYYMMDD>_<variable>` are ignored. A missing
    /// directory yields an empty inventory.
    pub fn scan(dir: &Path, year: i32, month: u32, extension: &str) -> std::io::Result<Self> {
        let mut inventory = Self {
            year,
            month,
            days: BTreeMap::new(),
        };
        if !dir.is_dir() {
            return Ok(inventory);
        }

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some((date, variable)) = stem.split_once('_') else {
                debug!(path = %path.display(), "Ignoring file without variable suffix");
                continue;
            };
            let Ok(date) = NaiveDate::parse_from_str(date, "%Y%m%d") else {
                debug!(path = %path.display(), "Ignoring file without date prefix");
                continue;
            };
            if date.year() != year || date.month() != month {
                warn!(path = %path.display(), "Ignoring dataset from another month");
                continue;
            }
            inventory
                .days
                .entry(variable.to_string())
                .or_default()
                .insert(date, path);
        }
        Ok(inventory)
    }

    pub fn expected_days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.days.keys().map(String::as_str)
    }

    /// Whether at least one variable is present and every variable has a
    /// dataset for each day of the month.
    pub fn is_complete(&self) -> bool {
        let expected = self.expected_days() as usize;
        !self.days.is_empty() && self.days.values().all(|d| d.len() == expected)
    }

    /// Days of the month without a dataset for `variable`.
    pub fn missing_days(&self, variable: &str) -> Vec<NaiveDate> {
        let present = self.days.get(variable);
        (1..=self.expected_days())
            .filter_map(|day| NaiveDate::from_ymd_opt(self.year, self.month, day))
            .filter(|date| present.map_or(true, |p| !p.contains_key(date)))
            .collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.days.values().flat_map(|d| d.values())
    }
}

/// Result of a merge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Monthly dataset written and per-day files removed.
    Merged { path: PathBuf, variables: usize, days: u32 },
    /// Some variable is missing days; nothing was touched.
    Incomplete,
    /// No per-day datasets at all.
    Empty,
    /// The month was complete but could not be merged; per-day datasets
    /// are left in place.
    Failed { reason: String },
}

/// Merge the month's per-day datasets into `monthly_path` if complete.
pub fn merge_month(
    store: &dyn GridStore,
    month_dir: &Path,
    monthly_path: &Path,
    year: i32,
    month: u32,
) -> FetchResult<MergeOutcome> {
    let inventory = MonthInventory::scan(month_dir, year, month, store.extension())?;

    if inventory.days.is_empty() {
        info!(year, month, "No daily datasets to merge");
        return Ok(MergeOutcome::Empty);
    }
    if !inventory.is_complete() {
        for variable in inventory.variables() {
            let missing = inventory.missing_days(variable);
            if !missing.is_empty() {
                let days: Vec<String> = missing.iter().map(|d| d.day().to_string()).collect();
                warn!(
                    year,
                    month,
                    variable,
                    count = missing.len(),
                    days = %days.join(","),
                    "Month incomplete, not merging"
                );
            }
        }
        return Ok(MergeOutcome::Incomplete);
    }

    let merged = concat_variables(store, &inventory)?;
    let partial = partial_path(monthly_path);
    if let Err(e) = store.write(&merged, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }
    std::fs::rename(&partial, monthly_path)?;

    for path in inventory.files() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove daily dataset");
        }
    }
    if let Err(e) = std::fs::remove_dir(month_dir) {
        warn!(path = %month_dir.display(), error = %e, "Month directory not removed");
    }

    info!(
        path = %monthly_path.display(),
        variables = merged.len(),
        days = inventory.expected_days(),
        "Merged monthly dataset"
    );
    Ok(MergeOutcome::Merged {
        path: monthly_path.to_path_buf(),
        variables: merged.len(),
        days: inventory.expected_days(),
    })
}

/// Concatenate each variable along time.
///
/// Variables are read and concatenated one at a time, so at most one
/// variable's month of daily grids is held besides the merged results.
fn concat_variables(store: &dyn GridStore, inventory: &MonthInventory) -> FetchResult<Vec<CalibratedGrid>> {
    let mut merged = Vec::with_capacity(inventory.days.len());
    for (variable, days) in &inventory.days {
        let mut grids = Vec::with_capacity(days.len());
        for path in days.values() {
            grids.extend(store.read(path)?);
        }
        debug!(variable = %variable, grids = grids.len(), "Read daily datasets");
        merged.push(CalibratedGrid::concat_time(grids)?);
    }
    merged.sort_by_key(|g| g.variable);
    Ok(merged)
}
