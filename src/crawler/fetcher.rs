//! HTTP fetcher implementation
//!
//! This module handles every probe request, including:
//! - Building HTTP clients with the crawler's identifying headers
//! - A single bounded GET per URL
//! - One retry without certificate verification after a TLS failure
//! - Error classification into short tags

use crate::config::UserAgentConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::error::Error as _;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Longest free-form detail kept for unclassified errors
const MAX_ERROR_DETAIL: usize = 100;

/// Normalized response of a probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// Response body; always empty for non-2xx statuses
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// True for a 200 response carrying a body
    pub fn has_document(&self) -> bool {
        self.status == 200 && !self.body.is_empty()
    }
}

/// Network-level failure of a probe request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("timeout")]
    Timeout,

    #[error("dns")]
    Dns,

    #[error("connect")]
    Connect,

    #[error("tls")]
    Tls,

    #[error("body")]
    Body,

    #[error("request: {0}")]
    Other(String),
}

impl FetchError {
    /// Short classification tag, safe to log or persist
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Body => "body",
            Self::Other(_) => "request",
        }
    }
}

/// Builds a probe client with the identifying headers
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total time allowed per request
/// * `verify_tls` - Whether certificates are verified
///
/// # Example
///
/// ```no_run
/// use agent_scout::config::UserAgentConfig;
/// use agent_scout::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "AgentScout".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(6), true).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
    verify_tls: bool,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .user_agent(config.header_value())
        .default_headers(headers)
        .timeout(timeout)
        .danger_accept_invalid_certs(!verify_tls)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the client candidate sources use for third-party APIs
///
/// No default timeout is set; each source applies its own per request.
pub fn build_api_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs probe requests
///
/// Cloning is cheap; the underlying clients share their connection pools.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    insecure: Client,
    timeout: Duration,
}

impl Fetcher {
    /// Creates a fetcher with a verifying and a non-verifying client
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout, true)?,
            insecure: build_http_client(config, timeout, false)?,
            timeout,
        })
    }

    /// Fetches a URL
    ///
    /// # Request Flow
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok` with status and body |
    /// | Any other status | `Ok` with status and empty body |
    /// | TLS validation failure | one retry without verification |
    /// | Timeout / DNS / connect | `Err` with a short tag |
    ///
    /// The retry only gets what is left of the timeout, so a whole fetch
    /// never takes longer than one timeout.
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let started = Instant::now();
        match send(&self.client, url, None).await {
            Err(FetchError::Tls) => {
                let remaining = remaining_budget(self.timeout, started.elapsed())
                    .ok_or(FetchError::Timeout)?;
                tracing::debug!("TLS verification failed for {}, retrying unverified", url);
                send(&self.insecure, url, Some(remaining)).await
            }
            outcome => outcome,
        }
    }
}

/// Time left of `timeout` after `elapsed`, if any
fn remaining_budget(timeout: Duration, elapsed: Duration) -> Option<Duration> {
    timeout.checked_sub(elapsed).filter(|left| !left.is_zero())
}

async fn send(
    client: &Client,
    url: &str,
    timeout: Option<Duration>,
) -> Result<FetchResponse, FetchError> {
    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(classify_error)?;
    let status = response.status();

    if !status.is_success() {
        return Ok(FetchResponse {
            status: status.as_u16(),
            body: Vec::new(),
        });
    }

    let body = response.bytes().await.map_err(classify_error)?;
    Ok(FetchResponse {
        status: status.as_u16(),
        body: body.to_vec(),
    })
}

/// Classifies a reqwest error into a `FetchError`
///
/// TLS and DNS failures surface as connect errors in reqwest, so the source
/// chain is inspected before falling back to the coarse flags.
pub fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::Timeout;
    }

    let chain = error_chain_text(&error);

    if ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| chain.contains(needle))
    {
        return FetchError::Tls;
    }

    if ["dns error", "failed to lookup", "name or service not known"]
        .iter()
        .any(|needle| chain.contains(needle))
    {
        return FetchError::Dns;
    }

    if error.is_connect() {
        return FetchError::Connect;
    }

    if error.is_body() || error.is_decode() {
        return FetchError::Body;
    }

    FetchError::Other(error.to_string().chars().take(MAX_ERROR_DETAIL).collect())
}

/// Joins the messages of the underlying causes; the top-level message is
/// skipped because it embeds the requested URL
fn error_chain_text(error: &reqwest::Error) -> String {
    let mut text = String::new();
    let mut source = error.source();
    while let Some(inner) = source {
        text.push_str(&inner.to_string());
        text.push_str(": ");
        source = inner.source();
    }
    text.to_lowercase()
}
