//! Agent record definitions
//!
//! An `AgentRecord` is the fixed-shape result of a successful probe: the
//! validated card fields plus where and when the card was found.

use crate::crawler::CardFields;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the identity digest
pub const AGENT_ID_LEN: usize = 12;

/// Provenance tag for records produced by a direct probe call
pub const DEFAULT_PROVENANCE: &str = "crawler";

/// A validated agent card discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Stable identifier, see [`agent_id`]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Canonical URL declared by the card (the probed base URL when absent)
    pub url: String,

    /// The well-known URL the card was fetched from
    pub agent_card_url: String,

    #[serde(default)]
    pub protocol_version: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub capabilities: Map<String, Value>,

    #[serde(default)]
    pub skills: Vec<Value>,

    #[serde(default)]
    pub skills_count: usize,

    #[serde(default)]
    pub provider: Map<String, Value>,

    #[serde(default)]
    pub authentication: Option<Value>,

    #[serde(default)]
    pub input_modes: Vec<String>,

    #[serde(default)]
    pub output_modes: Vec<String>,

    #[serde(deserialize_with = "deserialize_timestamp")]
    pub discovered_at: DateTime<Utc>,

    /// Which strategy produced the candidate
    pub source: String,
}

impl AgentRecord {
    /// Builds a record from validated card fields
    ///
    /// # Arguments
    ///
    /// * `card` - Fields extracted by the validator
    /// * `base_url` - The normalized base URL that was probed
    /// * `card_url` - The exact URL the card was fetched from
    /// * `source` - Provenance tag
    pub fn from_card(card: CardFields, base_url: &str, card_url: &str, source: &str) -> Self {
        let id = agent_id(&card.name, card.url.as_deref().unwrap_or(""));
        let skills_count = card.skills.len();

        Self {
            id,
            name: card.name,
            description: card.description,
            url: card.url.unwrap_or_else(|| base_url.to_string()),
            agent_card_url: card_url.to_string(),
            protocol_version: card.protocol_version,
            version: card.version,
            capabilities: card.capabilities,
            skills: card.skills,
            skills_count,
            provider: card.provider,
            authentication: card.authentication,
            input_modes: card.input_modes,
            output_modes: card.output_modes,
            discovered_at: Utc::now(),
            source: source.to_string(),
        }
    }

    /// Tags declared across all skills, in declaration order
    pub fn skill_tags(&self) -> impl Iterator<Item = &str> {
        self.skills
            .iter()
            .filter_map(|skill| skill.get("tags"))
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str)
    }
}

/// Computes the stable identifier of an agent
///
/// The identifier is the first 12 hex characters of
/// `sha256(lowercase(trim(name + "|" + url)))`, where `url` is the canonical
/// URL the card declares (empty when it declares none). It depends only on
/// these two values, so the same agent found through different probe paths
/// collapses onto one identifier.
///
/// # Examples
///
/// ```
/// use agent_scout::state::agent_id;
///
/// assert_eq!(agent_id("Echo", "https://example.test"), "1151f81a5612");
/// ```
pub fn agent_id(name: &str, declared_url: &str) -> String {
    let raw = format!("{}|{}", name, declared_url).to_lowercase();
    let digest = Sha256::digest(raw.trim().as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(AGENT_ID_LEN);
    id
}

/// Parses an RFC 3339 timestamp, or a naive `YYYY-MM-DDTHH:MM:SS[.ffffff]`
/// one read as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Serde adapter for [`parse_timestamp`]
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}
