//! File-based snapshot storage
//!
//! Two artifacts live in the state directory:
//! - `crawl-checked.txt`: every checked URL, one per line, sorted
//! - `crawl-discovered.json`: metadata plus the ordered agent records
//!
//! Both are rewritten, never appended, through a temporary sibling that is
//! renamed into place.

use crate::state::{deserialize_timestamp, AgentRecord, Snapshot};
use crate::storage::traits::{SnapshotStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CHECKED_FILE: &str = "crawl-checked.txt";
pub const DISCOVERED_FILE: &str = "crawl-discovered.json";
pub const LOG_FILE: &str = "crawl-log.txt";

/// Counts and timestamp written alongside the records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_updated: DateTime<Utc>,
    pub total_discovered: usize,
    pub total_urls_checked: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct DiscoveryDocument {
    metadata: SnapshotMetadata,
    #[serde(default)]
    agents: Vec<AgentRecord>,
}

/// Snapshot storage backed by two files in a state directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) a state directory
    ///
    /// # Returns
    ///
    /// * `Ok(FileStorage)` - The directory exists and is usable
    /// * `Err(StorageError)` - The directory could not be created
    pub fn new(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn checked_path(&self) -> PathBuf {
        self.dir.join(CHECKED_FILE)
    }

    pub fn discovered_path(&self) -> PathBuf {
        self.dir.join(DISCOVERED_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn load_checked(&self) -> StorageResult<Option<BTreeSet<String>>> {
        let path = self.checked_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
        Ok(Some(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }

    fn load_discovered(&self) -> StorageResult<Option<DiscoveryDocument>> {
        let path = self.discovered_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read(&path).map_err(|source| io_error(&path, source))?;
        let document = serde_json::from_slice(&content).map_err(|e| StorageError::Corrupt {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(document))
    }
}

impl SnapshotStore for FileStorage {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        let checked = self.load_checked()?;
        let document = self.load_discovered()?;

        if checked.is_none() && document.is_none() {
            return Ok(None);
        }

        let (discovered, last_updated) = match document {
            Some(doc) => (doc.agents, doc.metadata.last_updated),
            None => (Vec::new(), Utc::now()),
        };

        Ok(Some(Snapshot {
            checked: checked.unwrap_or_default(),
            discovered,
            last_updated,
        }))
    }

    fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let mut checked = String::new();
        for url in &snapshot.checked {
            checked.push_str(url);
            checked.push('\n');
        }

        let document = DiscoveryDocument {
            metadata: SnapshotMetadata {
                last_updated: snapshot.last_updated,
                total_discovered: snapshot.total_discovered(),
                total_urls_checked: snapshot.total_checked(),
            },
            agents: snapshot.discovered.clone(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        write_replace(&self.checked_path(), checked.as_bytes())?;
        write_replace(&self.discovered_path(), &json)?;
        Ok(())
    }
}

/// Writes to a temporary sibling, syncs it to disk, then renames over the
/// target
fn write_replace(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp).map_err(|source| io_error(&tmp, source))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|source| io_error(&tmp, source))?;
    drop(file);
    fs::rename(&tmp, path).map_err(|source| io_error(path, source))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CardFields;
    use tempfile::TempDir;

    fn record(name: &str) -> AgentRecord {
        let card = CardFields {
            name: name.to_string(),
            url: Some(format!("https://{}.test", name.to_lowercase())),
            skills: vec![serde_json::json!({"id": "s1"})],
            ..CardFields::default()
        };
        AgentRecord::from_card(
            card,
            "https://base.test",
            "https://base.test/.well-known/agent.json",
            "test",
        )
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            checked: [
                "https://b.test/.well-known/agent.json",
                "https://a.test/.well-known/agent.json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            discovered: vec![record("Zeta"), record("Alpha")],
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_empty_directory_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested).unwrap();
        assert!(storage.dir().is_dir());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let original = snapshot();

        storage.save(&original).unwrap();
        let loaded = storage.load().unwrap().unwrap();

        assert_eq!(loaded, original);
        // Discovery order is insertion order, not sorted
        assert_eq!(loaded.discovered[0].name, "Zeta");
    }

    #[test]
    fn test_checked_file_is_sorted_one_per_line() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save(&snapshot()).unwrap();

        let content = fs::read_to_string(storage.checked_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "https://a.test/.well-known/agent.json",
                "https://b.test/.well-known/agent.json"
            ]
        );
    }

    #[test]
    fn test_discovery_document_shape() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save(&snapshot()).unwrap();

        let content = fs::read(storage.discovered_path()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&content).unwrap();

        assert_eq!(value["metadata"]["total_discovered"], 2);
        assert_eq!(value["metadata"]["total_urls_checked"], 2);
        assert!(value["metadata"]["last_updated"].is_string());
        assert_eq!(value["agents"][0]["name"], "Zeta");
        assert_eq!(value["agents"][0]["skills_count"], 1);
        assert_eq!(value["agents"][0]["source"], "test");
    }

    #[test]
    fn test_save_rewrites_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save(&snapshot()).unwrap();

        let smaller = Snapshot {
            checked: ["https://only.test/x".to_string()].into_iter().collect(),
            discovered: vec![],
            last_updated: Utc::now(),
        };
        storage.save(&smaller).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.checked.len(), 1);
        assert!(loaded.discovered.is_empty());
        assert!(!dir.path().join("crawl-checked.tmp").exists());
    }

    #[test]
    fn test_checked_list_without_discoveries() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(storage.checked_path(), "https://a.test/x\n\nhttps://b.test/y").unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded.checked.len(), 2);
        assert!(loaded.discovered.is_empty());
    }

    #[test]
    fn test_corrupt_discovery_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(storage.discovered_path(), "{ not json").unwrap();

        assert!(matches!(
            storage.load(),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_loads_naive_timestamps_as_utc() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let document = serde_json::json!({
            "metadata": {
                "last_updated": "2026-01-01T10:00:00.123456",
                "total_discovered": 1,
                "total_urls_checked": 1
            },
            "agents": [{
                "id": "1151f81a5612",
                "name": "Echo",
                "description": "",
                "url": "https://example.test",
                "agent_card_url": "https://example.test/.well-known/agent.json",
                "discovered_at": "2026-01-01T09:59:58.000001",
                "source": "known"
            }]
        });
        fs::write(storage.discovered_path(), document.to_string()).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(
            loaded.last_updated.to_rfc3339(),
            "2026-01-01T10:00:00.123456+00:00"
        );
        assert_eq!(
            loaded.discovered[0].discovered_at.to_rfc3339(),
            "2026-01-01T09:59:58.000001+00:00"
        );
    }

    #[test]
    fn test_write_replace_leaves_only_the_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(CHECKED_FILE);
        fs::write(&target, "stale\n").unwrap();

        write_replace(&target, b"fresh\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh\n");
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![CHECKED_FILE.to_string()]);
    }

    #[test]
    fn test_write_replace_reports_unwritable_temp_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join(CHECKED_FILE);

        let result = write_replace(&target, b"x");
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }
}
