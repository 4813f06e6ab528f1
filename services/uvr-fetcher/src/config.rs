//! Run configuration.
//!
//! Values come from, highest precedence first: command-line flags,
//! environment variables, an optional YAML settings file, built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Daily UV directories of the 5 km global product.
pub const DEFAULT_BASE_URL: &str = "ftp://apollo.eorc.jaxa.jp/pub/JASMES/Global_05km/uv[a-b]/daily";
/// Files matched inside each `YYYYMM` directory.
pub const DEFAULT_FILE_PATTERN: &str = "*.gz";
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Invalid run parameters, detected before any network activity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("month {0} is not between 1 and 12")]
    MonthOutOfRange(u32),

    #[error("year {year} is in the future")]
    FutureYear { year: i32 },

    #[error("month {year}-{month:02} is in the future")]
    FutureMonth { year: i32, month: u32 },

    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// Optional settings file.
///
/// ```yaml
/// base_url: ftp://apollo.eorc.jaxa.jp/pub/JASMES/Global_05km/uv[a-b]/daily
/// output: /data/uvr
/// workers: 8
/// file_pattern: "*.gz"
/// queue_capacity: 128
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSettings {
    pub base_url: Option<String>,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub file_pattern: Option<String>,
    pub queue_capacity: Option<usize>,
}

impl FetchSettings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings = Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;
        debug!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Fully resolved parameters of one monthly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub year: i32,
    pub month: u32,
    /// Remote URL up to (not including) the `YYYYMM` directory; may contain
    /// glob segments
    pub base_url: String,
    pub file_pattern: String,
    /// Local output root
    pub output: PathBuf,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl FetchConfig {
    /// Configuration with default remote, workers and queue size.
    pub fn new(year: i32, month: u32, output: impl Into<PathBuf>) -> Self {
        Self {
            year,
            month,
            base_url: DEFAULT_BASE_URL.to_string(),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            output: output.into(),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Fill unset values from a settings file.
    pub fn with_settings(mut self, settings: &FetchSettings) -> Self {
        if let Some(base_url) = &settings.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(output) = &settings.output {
            self.output = output.clone();
        }
        if let Some(workers) = settings.workers {
            self.workers = workers;
        }
        if let Some(pattern) = &settings.file_pattern {
            self.file_pattern = pattern.clone();
        }
        if let Some(capacity) = settings.queue_capacity {
            self.queue_capacity = capacity;
        }
        self
    }

    /// Reject months outside 1..=12 and months after `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ConfigError> {
        if !(1..=12).contains(&self.month) {
            return Err(ConfigError::MonthOutOfRange(self.month));
        }
        if self.year > today.year() {
            return Err(ConfigError::FutureYear { year: self.year });
        }
        if self.year == today.year() && self.month > today.month() {
            return Err(ConfigError::FutureMonth {
                year: self.year,
                month: self.month,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }

    /// Glob URL of the month's remote files.
    pub fn glob_url(&self) -> String {
        format!(
            "{}/{:04}{:02}/{}",
            self.base_url.trim_end_matches('/'),
            self.year,
            self.month,
            self.file_pattern
        )
    }

    /// `<output>/<year>`
    pub fn year_dir(&self) -> PathBuf {
        self.output.join(self.year.to_string())
    }

    /// `<output>/<year>/<month>`, month not zero-padded.
    pub fn month_dir(&self) -> PathBuf {
        self.year_dir().join(self.month.to_string())
    }

    /// `<output>/<year>/<YYYYMM>.<extension>`
    pub fn monthly_path(&self, extension: &str) -> PathBuf {
        self.year_dir()
            .join(format!("{:04}{:02}.{}", self.year, self.month, extension))
    }
}
