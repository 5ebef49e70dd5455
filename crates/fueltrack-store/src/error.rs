//! Error types for fueltrack-store.

use std::path::PathBuf;

/// Result type for fueltrack-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while writing the price history.
///
/// Reading never fails: an absent or damaged document is reported through
/// [`SnapshotSource`](crate::SnapshotSource) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to create the directory holding the document.
    #[error("Failed to create store directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to acquire the writer lock.
    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Another writer holds the lock.
    #[error("Store {0} is locked by another writer")]
    Busy(PathBuf),

    /// Failed to replace the document with its new content.
    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
