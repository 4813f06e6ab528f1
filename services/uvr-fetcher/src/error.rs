//! Error types for retrieval jobs.

use grid_store::StoreError;
use thiserror::Error;
use uvr_format::{DecodeError, GridError, NameError};

use crate::remote::RemoteError;

/// Result type for retrieval operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure of a single retrieval job or of the monthly merge.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Daily grids could not be concatenated into the month.
    #[error("merge failed: {0}")]
    Grid(#[from] GridError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Every worker has exited; the queue no longer accepts jobs.
    #[error("job queue closed")]
    QueueClosed,
}
