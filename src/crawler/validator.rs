//! Agent card validation
//!
//! Turns a fetched body into card fields, or nothing. Parse failures and
//! non-card documents are both "not an agent card"; nothing here returns an
//! error.

use serde_json::{Map, Value};

/// Keys of which at least one must be present for a document to be a card
pub const PROTOCOL_MARKERS: &[&str] = &[
    "protocolVersion",
    "skills",
    "capabilities",
    "defaultInputModes",
    "defaultOutputModes",
];

/// Fields extracted from a valid agent card
///
/// Optional fields default to empty values when missing or of the wrong type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFields {
    pub name: String,
    pub description: String,
    /// Canonical URL as declared by the card
    pub url: Option<String>,
    pub protocol_version: Option<String>,
    pub version: Option<String>,
    pub capabilities: Map<String, Value>,
    pub skills: Vec<Value>,
    pub provider: Map<String, Value>,
    pub authentication: Option<Value>,
    pub input_modes: Vec<String>,
    pub output_modes: Vec<String>,
}

/// Parses and validates a response body as an agent card
///
/// # Returns
///
/// * `Some(CardFields)` - The body is a JSON object with a `name` key and at
///   least one protocol marker key
/// * `None` - Anything else, including malformed JSON
pub fn validate_card(body: &[u8]) -> Option<CardFields> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;

    if !is_agent_card(object) {
        return None;
    }

    Some(extract_fields(object))
}

/// Checks the card shape: `name` plus at least one protocol marker
pub fn is_agent_card(object: &Map<String, Value>) -> bool {
    object.contains_key("name") && PROTOCOL_MARKERS.iter().any(|key| object.contains_key(*key))
}

fn extract_fields(object: &Map<String, Value>) -> CardFields {
    CardFields {
        name: display_name(object.get("name")),
        description: string_field(object, "description").unwrap_or_default(),
        url: string_field(object, "url").filter(|url| !url.is_empty()),
        protocol_version: string_field(object, "protocolVersion"),
        version: scalar_field(object, "version"),
        capabilities: object_field(object, "capabilities"),
        skills: object
            .get("skills")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        provider: object_field(object, "provider"),
        authentication: object.get("authentication").filter(|v| !v.is_null()).cloned(),
        input_modes: string_list(object, "defaultInputModes"),
        output_modes: string_list(object, "defaultOutputModes"),
    }
}

/// Names are usually strings; anything else is kept as its JSON text
fn display_name(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Null) | None => "Unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Strings and numbers (e.g. `"version": 2`) both read as text
fn scalar_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn object_field(object: &Map<String, Value>, key: &str) -> Map<String, Value> {
    object
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
