//! Shared error types for the services crate.

use thiserror::Error;

use edutube_core::model::ProgressError;
use storage::StorageError;

/// Errors emitted by `ProgressTracker` and `PlaybackObserver`.
///
/// Loads never appear here: unreadable stored state degrades to an empty
/// record at the storage layer instead of failing the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
