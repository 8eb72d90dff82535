use crate::state::AgentRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Point-in-time copy of the persisted crawl state
///
/// The checked set is kept sorted so that the checked-URL list is written in
/// a stable order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub checked: BTreeSet<String>,
    pub discovered: Vec<AgentRecord>,
    pub last_updated: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot, used for fresh runs
    pub fn empty() -> Self {
        Self {
            checked: BTreeSet::new(),
            discovered: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn total_checked(&self) -> usize {
        self.checked.len()
    }

    pub fn total_discovered(&self) -> usize {
        self.discovered.len()
    }
}
