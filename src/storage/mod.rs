//! Storage module for persisting crawl progress
//!
//! This module handles durable state for the crawler:
//! - The checked-URL list and discovery snapshot
//! - Crash-safe rewrites of both artifacts
//! - Reloading state at startup for resumption

mod files;
mod traits;

pub use files::{FileStorage, SnapshotMetadata, CHECKED_FILE, DISCOVERED_FILE, LOG_FILE};
pub use traits::{SnapshotStore, StorageError, StorageResult};

use crate::state::Snapshot;
use std::path::Path;

/// Opens the state directory and loads any persisted snapshot
///
/// # Arguments
///
/// * `dir` - The state directory
/// * `fresh` - Ignore whatever is persisted and start empty
///
/// # Returns
///
/// * `Ok((FileStorage, Snapshot))` - Storage handle and the starting state
/// * `Err(StorageError)` - The directory is unusable or the snapshot is corrupt
pub fn open_storage(dir: &Path, fresh: bool) -> StorageResult<(FileStorage, Snapshot)> {
    let storage = FileStorage::new(dir)?;

    let snapshot = if fresh {
        tracing::info!("Starting fresh, ignoring persisted state in {}", dir.display());
        Snapshot::empty()
    } else {
        match storage.load()? {
            Some(snapshot) => {
                tracing::info!(
                    "Resume: {} previously checked URLs, {} previously discovered agents",
                    snapshot.total_checked(),
                    snapshot.total_discovered()
                );
                snapshot
            }
            None => Snapshot::empty(),
        }
    };

    Ok((storage, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_storage_fresh_ignores_state() {
        let dir = TempDir::new().unwrap();
        let (storage, _) = open_storage(dir.path(), false).unwrap();

        let mut snapshot = Snapshot::empty();
        snapshot.checked.insert("https://a.test/x".to_string());
        storage.save(&snapshot).unwrap();

        let (_, resumed) = open_storage(dir.path(), false).unwrap();
        assert_eq!(resumed.total_checked(), 1);

        let (_, fresh) = open_storage(dir.path(), true).unwrap();
        assert_eq!(fresh.total_checked(), 0);
    }
}
