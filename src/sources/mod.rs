//! Candidate sources
//!
//! Every discovery strategy is a `CandidateSource`: it produces a finite list
//! of candidates, possibly through its own calls to a third-party API, and
//! tells the engine whether to probe them one by one or through the worker
//! pool. A source failing never aborts the run.

mod ct;
mod domains;
mod github;
mod known;
mod platforms;
mod registry;

pub use ct::{extract_cert_domains, CtSource};
pub use domains::DomainsSource;
pub use github::GithubSource;
pub use known::KnownSource;
pub use platforms::{expand_template, PlatformsSource};
pub use registry::RegistrySource;

use crate::config::Config;
use crate::crawler::{Fetcher, Shutdown};
use crate::state::DedupStore;
use crate::ScoutError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Strategy names in the order they run
pub const STRATEGY_NAMES: &[&str] = &["known", "registry", "github", "ct", "platforms", "domains"];

/// Something the engine can probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// A base URL, probed as is
    Url(String),

    /// A hint domain, probed as `https://{domain}`
    Domain(String),

    /// Base URLs probed in order until one yields a record
    FirstOf(Vec<String>),
}

/// How the engine works through a source's candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// One candidate at a time, in order
    Sequential,

    /// Through the bounded worker pool
    Pooled,
}

/// Errors raised by a source's own upstream calls
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("missing credentials: {0} is not set")]
    MissingCredentials(String),

    #[error("unexpected response from {url}: {message}")]
    Parse { url: String, message: String },
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Handles a source may use while collecting candidates
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Client for third-party APIs; sources set per-request timeouts
    pub api: Client,

    /// Probe fetcher, for sources that fetch candidate documents themselves
    pub fetcher: Fetcher,

    /// Shared checked set; URLs a source fetches directly go through it too
    pub store: Arc<DedupStore>,

    pub shutdown: Arc<Shutdown>,

    pub well_known_paths: Vec<String>,
}

/// A discovery strategy
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Strategy name, also used as the provenance tag of its records
    fn name(&self) -> &'static str;

    fn dispatch(&self) -> Dispatch;

    /// Collects the candidates to probe
    ///
    /// When a stop is requested mid-collection, the candidates gathered so far
    /// are returned.
    async fn candidates(&self, ctx: &SourceContext) -> SourceResult<Vec<Candidate>>;
}

/// Builds the sources for the requested strategy names
///
/// Names are matched case-insensitively and the sources are returned in
/// canonical order regardless of the order given. An empty list selects all
/// strategies.
///
/// # Returns
///
/// * `Ok(Vec)` - One source per selected strategy
/// * `Err(ScoutError::UnknownStrategy)` - A name matches no strategy
pub fn build_sources(
    config: &Config,
    names: &[String],
) -> Result<Vec<Box<dyn CandidateSource>>, ScoutError> {
    let requested: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

    if let Some(unknown) = requested
        .iter()
        .find(|name| !STRATEGY_NAMES.contains(&name.as_str()))
    {
        return Err(ScoutError::UnknownStrategy(unknown.clone()));
    }

    let sources = &config.sources;
    let mut built: Vec<Box<dyn CandidateSource>> = Vec::new();

    for name in STRATEGY_NAMES {
        if !requested.is_empty() && !requested.iter().any(|r| r == name) {
            continue;
        }

        let source: Box<dyn CandidateSource> = match *name {
            "known" => Box::new(KnownSource::new(sources.known.clone())),
            "registry" => Box::new(RegistrySource::from_env(
                sources.registry.clone(),
                &sources.github.token_env,
            )),
            "github" => Box::new(GithubSource::from_env(sources.github.clone())),
            "ct" => Box::new(CtSource::new(sources.ct.clone())),
            "platforms" => Box::new(PlatformsSource::new(sources.platforms.clone())),
            "domains" => Box::new(DomainsSource::new(sources.domains.clone())),
            other => return Err(ScoutError::UnknownStrategy(other.to_string())),
        };
        built.push(source);
    }

    Ok(built)
}

/// Sends an API request and decodes its JSON body
///
/// 403 and 429 map to `RateLimited`; any other non-2xx status to `Status`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> SourceResult<T> {
    let response = request.send().await.map_err(|source| SourceError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| SourceError::Http {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_slice(&body).map_err(|e| SourceError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Reads a token from the environment, treating an empty value as unset
pub(crate) fn token_from_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
