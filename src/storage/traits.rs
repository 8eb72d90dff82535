//! Storage traits and error types
//!
//! This module defines the trait interface for snapshot persistence backends
//! and the associated error type.

use crate::state::Snapshot;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt snapshot {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot persistence backends
///
/// Implementations only read the snapshots they are handed; they never see
/// or mutate the engine's live state. A failed `save` leaves the previous
/// snapshot intact, and the next successful `save` carries the lost update.
pub trait SnapshotStore: Send + Sync {
    /// Loads the persisted snapshot
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Snapshot))` - A previous run left state behind
    /// * `Ok(None)` - Nothing has been persisted yet
    fn load(&self) -> StorageResult<Option<Snapshot>>;

    /// Replaces the persisted snapshot
    fn save(&self, snapshot: &Snapshot) -> StorageResult<()>;
}
