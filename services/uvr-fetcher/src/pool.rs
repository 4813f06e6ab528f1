//! Bounded pool of retrieval workers.
//!
//! Jobs flow through a bounded channel shared by all workers. Dropping the
//! sender is the close signal: each worker drains what is left and exits
//! once the channel is empty.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use grid_store::GridStore;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::download::{download, persist_async};
use crate::error::{FetchError, FetchResult};
use crate::remote::{RemoteFile, RemoteSource};

/// One file to retrieve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalJob {
    pub file: RemoteFile,
    /// Final path of the per-day dataset
    pub destination: PathBuf,
}

/// Job outcome counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub completed: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for PoolStats {
    fn add_assign(&mut self, other: Self) {
        self.completed += other.completed;
        self.failed += other.failed;
    }
}

type JobReceiver = Arc<Mutex<mpsc::Receiver<RetrievalJob>>>;

/// A fixed number of workers consuming a shared job queue.
pub struct WorkerPool {
    sender: mpsc::Sender<RetrievalJob>,
    workers: Vec<JoinHandle<PoolStats>>,
}

impl WorkerPool {
    /// Spawn `workers` workers (at least one) on the current runtime.
    pub fn start(
        workers: usize,
        queue_capacity: usize,
        source: Arc<dyn RemoteSource>,
        store: Arc<dyn GridStore>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver: JobReceiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    receiver.clone(),
                    source.clone(),
                    store.clone(),
                ))
            })
            .collect();

        Self { sender, workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueue a job, waiting while the queue is full.
    pub async fn submit(&self, job: RetrievalJob) -> FetchResult<()> {
        self.sender
            .send(job)
            .await
            .map_err(|_| FetchError::QueueClosed)
    }

    /// Close the queue and wait for every worker to finish.
    pub async fn join(self) -> PoolStats {
        drop(self.sender);

        let mut total = PoolStats::default();
        for result in join_all(self.workers).await {
            match result {
                Ok(stats) => total += stats,
                Err(e) => error!(error = %e, "Worker task panicked"),
            }
        }
        total
    }
}

async fn worker_loop(
    id: usize,
    receiver: JobReceiver,
    source: Arc<dyn RemoteSource>,
    store: Arc<dyn GridStore>,
) -> PoolStats {
    debug!(worker = id, "Worker started");
    let mut stats = PoolStats::default();

    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        match process(source.as_ref(), store.clone(), &job).await {
            Ok(()) => {
                stats.completed += 1;
                info!(
                    worker = id,
                    url = %job.file.url,
                    path = %job.destination.display(),
                    "Retrieved file"
                );
            }
            Err(e) => {
                stats.failed += 1;
                error!(worker = id, url = %job.file.url, error = %e, "Retrieval failed");
            }
        }
    }

    debug!(
        worker = id,
        completed = stats.completed,
        failed = stats.failed,
        "Worker finished"
    );
    stats
}

async fn process(
    source: &dyn RemoteSource,
    store: Arc<dyn GridStore>,
    job: &RetrievalJob,
) -> FetchResult<()> {
    let grid = download(source, &job.file).await?;
    persist_async(store, grid, job.destination.clone()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_add() {
        let mut total = PoolStats::default();
        total += PoolStats { completed: 2, failed: 1 };
        total += PoolStats { completed: 3, failed: 0 };
        assert_eq!(total, PoolStats { completed: 5, failed: 1 });
    }
}
