//! Crawler module for agent card probing
//!
//! This module contains the core discovery logic, including:
//! - HTTP fetching with a single TLS fallback retry
//! - Agent card validation
//! - The probe engine and its bounded worker pool
//! - Cooperative shutdown on interrupt

mod engine;
mod fetcher;
mod shutdown;
mod validator;

pub use engine::ProbeEngine;
pub use fetcher::{
    build_api_client, build_http_client, classify_error, FetchError, FetchResponse, Fetcher,
};
pub use shutdown::Shutdown;
pub use validator::{is_agent_card, validate_card, CardFields, PROTOCOL_MARKERS};
