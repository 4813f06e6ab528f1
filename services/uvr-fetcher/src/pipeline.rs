//! One monthly retrieval run.
//!
//! 1. Skip the month entirely if its merged dataset already exists.
//! 2. Start the worker pool.
//! 3. Expand the month's glob URL and enqueue a job for every product file
//!    whose per-day dataset is not on disk yet.
//! 4. Close the queue and wait for the workers.
//! 5. Merge the month if every variable is complete.

use std::collections::HashSet;
use std::sync::Arc;

use grid_store::GridStore;
use tracing::{debug, error, info, instrument, warn};
use uvr_format::parse_remote_name;

use crate::config::FetchConfig;
use crate::error::FetchResult;
use crate::merge::{merge_month, MergeOutcome};
use crate::pool::{RetrievalJob, WorkerPool};
use crate::remote::{list_matching, source_for_url, RemoteSource};

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// The monthly dataset existed before the run; nothing was done.
    pub already_merged: bool,
    /// Files matched by the glob URL
    pub listed: usize,
    /// Files whose per-day dataset was already on disk
    pub skipped_existing: usize,
    /// Files whose name is not a product name
    pub skipped_invalid: usize,
    /// Files mapping to a dataset already claimed earlier in this run
    pub skipped_duplicate: usize,
    pub enqueued: usize,
    pub completed: usize,
    pub failed: usize,
    pub merge: Option<MergeOutcome>,
}

impl RunSummary {
    pub fn merged(&self) -> bool {
        matches!(self.merge, Some(MergeOutcome::Merged { .. }))
    }
}

/// Retrieval of one month from one remote source into one store.
pub struct Pipeline {
    config: FetchConfig,
    source: Arc<dyn RemoteSource>,
    store: Arc<dyn GridStore>,
}

impl Pipeline {
    pub fn new(config: FetchConfig, source: Arc<dyn RemoteSource>, store: Arc<dyn GridStore>) -> Self {
        Self {
            config,
            source,
            store,
        }
    }

    /// Pipeline whose transport is chosen from the base URL's scheme.
    pub fn from_config(config: FetchConfig, store: Arc<dyn GridStore>) -> FetchResult<Self> {
        let source = source_for_url(&config.glob_url())?;
        Ok(Self::new(config, source, store))
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    #[instrument(skip(self), fields(year = self.config.year, month = self.config.month))]
    pub async fn run(&self) -> FetchResult<RunSummary> {
        let config = &self.config;
        let extension = self.store.extension();
        let monthly_path = config.monthly_path(extension);
        let mut summary = RunSummary::default();

        if monthly_path.exists() {
            info!(path = %monthly_path.display(), "Monthly dataset already exists, nothing to do");
            summary.already_merged = true;
            return Ok(summary);
        }

        let month_dir = config.month_dir();
        tokio::fs::create_dir_all(&month_dir).await?;

        let pool = WorkerPool::start(
            config.workers,
            config.queue_capacity,
            self.source.clone(),
            self.store.clone(),
        );

        let glob_url = config.glob_url();
        info!(url = %glob_url, workers = pool.worker_count(), "Listing remote files");
        let files = match list_matching(self.source.as_ref(), &glob_url).await {
            Ok(files) => files,
            Err(e) => {
                pool.join().await;
                return Err(e.into());
            }
        };
        summary.listed = files.len();

        let mut destinations = HashSet::new();
        for file in files {
            let meta = match parse_remote_name(file.name()) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(url = %file.url, error = %e, "Skipping file with unrecognized name");
                    summary.skipped_invalid += 1;
                    continue;
                }
            };

            let destination = month_dir.join(format!("{}.{}", meta.output_stem(), extension));
            if destination.exists() {
                debug!(path = %destination.display(), "Daily dataset exists, skipping");
                summary.skipped_existing += 1;
                continue;
            }
            if !destinations.insert(destination.clone()) {
                warn!(url = %file.url, path = %destination.display(), "Another file already maps to this dataset, skipping");
                summary.skipped_duplicate += 1;
                continue;
            }

            pool.submit(RetrievalJob { file, destination }).await?;
            summary.enqueued += 1;
        }

        info!(
            listed = summary.listed,
            enqueued = summary.enqueued,
            skipped = summary.skipped_existing + summary.skipped_invalid + summary.skipped_duplicate,
            "Enumeration finished, waiting for workers"
        );
        let stats = pool.join().await;
        summary.completed = stats.completed;
        summary.failed = stats.failed;

        let store = self.store.clone();
        let (year, month) = (config.year, config.month);
        let merge_dir = month_dir.clone();
        let merged = tokio::task::spawn_blocking(move || {
            merge_month(store.as_ref(), &merge_dir, &monthly_path, year, month)
        })
        .await?;
        let outcome = match merged {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    path = %month_dir.display(),
                    error = %e,
                    "Merge failed, daily datasets left in place"
                );
                MergeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        summary.merge = Some(outcome);

        info!(
            completed = summary.completed,
            failed = summary.failed,
            merged = summary.merged(),
            "Run finished"
        );
        Ok(summary)
    }
}
