//! Registration script rendering
//!
//! Renders a bash script that posts every discovered agent to a directory
//! API. The API base defaults to the configured URL and can be overridden by
//! the script's first argument.

use crate::output::{OutputError, OutputResult};
use crate::state::AgentRecord;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Records whose name contains this (case-insensitively) are not registered
pub const REGISTRATION_SKIP: &str = "agentpages";

const MAX_DESCRIPTION: usize = 500;
const MAX_TAGS: usize = 10;
const DEFAULT_PROTOCOL_VERSION: &str = "0.3.0";

/// Renders the registration script
///
/// # Arguments
///
/// * `records` - Discovered agents, in discovery order
/// * `api_url` - Default API base URL
/// * `generated_at` - Timestamp written in the header
pub fn render_registration_script(
    records: &[AgentRecord],
    api_url: &str,
    generated_at: DateTime<Utc>,
) -> OutputResult<String> {
    let mut lines = vec![
        "#!/bin/bash".to_string(),
        "# Auto-generated by agent-scout".to_string(),
        format!("# Generated: {}", generated_at.to_rfc3339()),
        format!("# Found {} live agents", records.len()),
        String::new(),
        format!("API_URL=\"${{1:-{}}}\"", api_url),
        String::new(),
    ];

    for record in records {
        if record.name.to_lowercase().contains(REGISTRATION_SKIP) {
            continue;
        }

        let body = serde_json::to_string(&registration_body(record))?;
        lines.push(format!(
            "echo \"Registering: {}...\"",
            escape_double_quoted(&record.name)
        ));
        lines.push("curl -s -X POST \"$API_URL/api/agents\" \\".to_string());
        lines.push("  -H 'Content-Type: application/json' \\".to_string());
        lines.push(format!("  -d '{}'", escape_single_quoted(&body)));
        lines.push("echo".to_string());
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

/// Renders the script to `path` and makes it executable
pub fn write_registration_script(
    path: &Path,
    records: &[AgentRecord],
    api_url: &str,
) -> OutputResult<()> {
    let script = render_registration_script(records, api_url, Utc::now())?;
    let write_error = |source| OutputError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, script).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(write_error)?;
    }

    tracing::info!("Registration script: {}", path.display());
    Ok(())
}

fn registration_body(record: &AgentRecord) -> Value {
    let provider_org = provider_str(&record.provider, "organization")
        .or_else(|| provider_str(&record.provider, "name"))
        .unwrap_or_default();

    let tags: BTreeSet<&str> = record.skill_tags().collect();
    let tags: Vec<&str> = tags.into_iter().take(MAX_TAGS).collect();

    json!({
        "name": record.name,
        "description": record.description.chars().take(MAX_DESCRIPTION).collect::<String>(),
        "url": record.url,
        "agent_card_url": record.agent_card_url,
        "provider_org": provider_org,
        "provider_url": provider_str(&record.provider, "url").unwrap_or_default(),
        "platform": "custom",
        "type": "agent",
        "version": record.version.clone().unwrap_or_default(),
        "protocol_version": record
            .protocol_version
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
        "capabilities": record.capabilities,
        "input_modes": modes_or_text(&record.input_modes),
        "output_modes": modes_or_text(&record.output_modes),
        "skills": record.skills,
        "tags": tags,
        "verified": true,
        "last_seen_at": record.discovered_at.to_rfc3339(),
    })
}

fn provider_str(provider: &Map<String, Value>, key: &str) -> Option<String> {
    provider
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn modes_or_text(modes: &[String]) -> Vec<String> {
    if modes.is_empty() {
        vec!["text".to_string()]
    } else {
        modes.to_vec()
    }
}

/// Escapes text for a single-quoted shell word
fn escape_single_quoted(text: &str) -> String {
    text.replace('\'', "'\\''")
}

/// Escapes text for a double-quoted shell word
fn escape_double_quoted(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
