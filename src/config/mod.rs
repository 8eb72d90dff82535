//! Configuration module for Agent Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! When no file is given, a built-in configuration with the stock candidate
//! lists is used.
//!
//! # Example
//!
//! ```no_run
//! use agent_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Probe timeout: {}s", config.crawler.timeout_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, CtConfig, DomainsConfig, GithubConfig, KnownConfig, OutputConfig,
    PlatformsConfig, RegistryConfig, SourcesConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, default_config, load_config, load_config_with_hash, parse_config,
};
