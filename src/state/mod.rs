//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `AgentRecord`: a validated agent card discovery and its stable identifier
//! - `DedupStore`: the synchronized checked set and discovered set of a run
//! - `Snapshot`: the point-in-time copy handed to the persistence layer

mod dedup;
mod record;
mod snapshot;

// Re-export main types
pub use dedup::{DedupStore, RunCounters};
pub use record::{agent_id, parse_timestamp, AgentRecord, AGENT_ID_LEN, DEFAULT_PROVENANCE};
pub(crate) use record::deserialize_timestamp;
pub use snapshot::Snapshot;
