use crate::state::{AgentRecord, Snapshot};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Counters reported in the run summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub checked_this_run: u64,
    pub total_checked: u64,
    pub found_this_run: u64,
    pub total_discovered: u64,
}

#[derive(Debug, Default)]
struct Inner {
    checked: HashSet<String>,
    discovered: Vec<AgentRecord>,
    ids: HashSet<String>,
    checked_this_run: u64,
    found_this_run: u64,
}

/// Tracks checked URLs and discovered agents
///
/// This is the only shared mutable state of a run. Every operation takes the
/// same lock, so test-and-set sequences (`mark_checked`, `insert_if_absent`)
/// are atomic with respect to other workers. The lock is never held across an
/// await point.
#[derive(Debug, Default)]
pub struct DedupStore {
    inner: Mutex<Inner>,
}

impl DedupStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a persisted snapshot
    ///
    /// Run counters start at zero. Duplicate identifiers in the snapshot keep
    /// their first occurrence.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut inner = Inner {
            checked: snapshot.checked.into_iter().collect(),
            ..Inner::default()
        };

        for record in snapshot.discovered {
            if inner.ids.insert(record.id.clone()) {
                inner.discovered.push(record);
            }
        }

        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if the URL was attempted in this or any prior run
    pub fn is_checked(&self, url: &str) -> bool {
        self.lock().checked.contains(url)
    }

    /// Marks a URL as attempted
    ///
    /// Returns true if this call added it, false if it was already checked.
    /// A caller that gets `true` owns the single fetch of that URL.
    pub fn mark_checked(&self, url: &str) -> bool {
        let mut inner = self.lock();
        if inner.checked.contains(url) {
            return false;
        }
        inner.checked.insert(url.to_string());
        inner.checked_this_run += 1;
        true
    }

    /// Appends a record unless one with the same identifier exists
    ///
    /// Returns false and leaves the store untouched when the identifier is
    /// already present, keeping the first-seen record.
    pub fn insert_if_absent(&self, record: AgentRecord) -> bool {
        let mut inner = self.lock();
        if inner.ids.contains(&record.id) {
            return false;
        }
        inner.ids.insert(record.id.clone());
        inner.discovered.push(record);
        inner.found_this_run += 1;
        true
    }

    /// Returns true if an agent with this identifier was discovered
    pub fn contains_agent(&self, id: &str) -> bool {
        self.lock().ids.contains(id)
    }

    /// Copies the discovered agents in insertion order
    pub fn discovered(&self) -> Vec<AgentRecord> {
        self.lock().discovered.clone()
    }

    /// Takes a point-in-time copy of the persisted state
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            checked: inner.checked.iter().cloned().collect(),
            discovered: inner.discovered.clone(),
            last_updated: Utc::now(),
        }
    }

    /// Current run counters
    pub fn counters(&self) -> RunCounters {
        let inner = self.lock();
        RunCounters {
            checked_this_run: inner.checked_this_run,
            total_checked: inner.checked.len() as u64,
            found_this_run: inner.found_this_run,
            total_discovered: inner.discovered.len() as u64,
        }
    }
}
