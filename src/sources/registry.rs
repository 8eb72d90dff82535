//! Agent registry listing
//!
//! The registry publishes one JSON document per agent in a repository
//! directory; the directory listing gives each document's download URL and
//! each document declares the agent's base `url`.

use crate::config::RegistryConfig;
use crate::sources::{
    fetch_json, token_from_env, Candidate, CandidateSource, Dispatch, SourceContext, SourceError,
    SourceResult,
};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const LISTING_TIMEOUT: Duration = Duration::from_secs(10);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(8);

/// Aggregate index file skipped in the listing
const INDEX_FILE: &str = "agents.json";

#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(default)]
    download_url: Option<String>,
}

pub struct RegistrySource {
    config: RegistryConfig,
    token: Option<String>,
}

impl RegistrySource {
    pub fn new(config: RegistryConfig, token: Option<String>) -> Self {
        Self { config, token }
    }

    /// Uses the token from `token_env` when set; the listing works without one
    pub fn from_env(config: RegistryConfig, token_env: &str) -> Self {
        Self::new(config, token_from_env(token_env))
    }
}

#[async_trait]
impl CandidateSource for RegistrySource {
    fn name(&self) -> &'static str {
        "registry"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Sequential
    }

    async fn candidates(&self, ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        let mut request = ctx.api.get(&self.config.listing_url).timeout(LISTING_TIMEOUT);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let listing: Vec<ListingEntry> = fetch_json(request, &self.config.listing_url).await?;
        let documents: Vec<&str> = listing
            .iter()
            .filter(|entry| entry.name.ends_with(".json") && entry.name != INDEX_FILE)
            .filter_map(|entry| entry.download_url.as_deref())
            .collect();
        tracing::info!("Registry: found {} agent files", documents.len());

        let delay = Duration::from_millis(self.config.delay_ms);
        let backoff = Duration::from_secs(self.config.rate_limit_backoff_secs);
        let mut candidates = Vec::new();

        for (i, download_url) in documents.into_iter().enumerate() {
            if i > 0 && !ctx.shutdown.pause(delay).await {
                break;
            }

            let request = ctx.api.get(download_url).timeout(DOCUMENT_TIMEOUT);
            match fetch_json::<Value>(request, download_url).await {
                Ok(document) => {
                    let url = document
                        .get("url")
                        .and_then(Value::as_str)
                        .map(|url| url.trim_end_matches('/'))
                        .filter(|url| url.starts_with("http"));
                    if let Some(url) = url {
                        candidates.push(Candidate::Url(url.to_string()));
                    }
                }
                Err(SourceError::RateLimited { .. }) => {
                    tracing::warn!("Registry: rate limited, backing off {}s", backoff.as_secs());
                    if !ctx.shutdown.pause(backoff).await {
                        break;
                    }
                }
                Err(e) => tracing::debug!("Registry document skipped: {}", e),
            }
        }

        Ok(candidates)
    }
}
