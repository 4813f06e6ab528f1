//! Retrieval of JASMES UVR products.
//!
//! For one month the fetcher expands a glob URL on the remote archive,
//! downloads and decodes every matching product file with a bounded pool of
//! workers, writes one dataset per day and variable, and merges the month
//! into a single dataset once every day is present.
//!
//! Runs are resumable: per-day datasets already on disk are not fetched
//! again, and a month with a merged dataset is skipped entirely.

pub mod config;
pub mod download;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod pool;
pub mod remote;

pub use config::{ConfigError, FetchConfig, FetchSettings};
pub use error::{FetchError, FetchResult};
pub use merge::{days_in_month, merge_month, MergeOutcome, MonthInventory};
pub use pipeline::{Pipeline, RunSummary};
pub use pool::{PoolStats, RetrievalJob, WorkerPool};
pub use remote::{
    list_matching, source_for_url, FtpSource, LocalSource, RemoteError, RemoteFile, RemoteSource,
};
