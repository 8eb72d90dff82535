use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Agent Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Probe engine behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Per-request fetch timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Width of the worker pool used by pooled strategies
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Suffix paths tried against every base URL, in order
    #[serde(rename = "well-known-paths")]
    pub well_known_paths: Vec<String>,

    /// Completed candidates between progress lines and periodic flushes
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u32,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_progress_interval() -> u32 {
    200
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding the checked list, discovery snapshot and run log
    #[serde(rename = "state-dir")]
    pub state_dir: PathBuf,

    /// Where the registration script is written
    #[serde(rename = "registration-script")]
    pub registration_script: PathBuf,

    /// Default API base URL baked into the registration script
    #[serde(rename = "api-url")]
    pub api_url: String,
}

/// Settings for every candidate source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub known: KnownConfig,
    #[serde(default)]
    pub domains: DomainsConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub ct: CtConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Static list of base URLs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnownConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Hint domains probed as `https://{domain}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainsConfig {
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Name prefixes crossed with hosting platform templates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformsConfig {
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// URL templates with a single `{}` placeholder, e.g. `https://{}.fly.dev`
    #[serde(default)]
    pub templates: Vec<String>,
}

/// Certificate-transparency log mining
#[derive(Debug, Clone, Deserialize)]
pub struct CtConfig {
    pub endpoint: String,
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Pause after a rate-limit response before the next term
    #[serde(
        rename = "rate-limit-backoff-secs",
        default = "default_rate_limit_backoff_secs"
    )]
    pub rate_limit_backoff_secs: u64,
}

impl Default for CtConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://crt.sh/".to_string(),
            terms: Vec::new(),
            timeout_secs: 20,
            delay_ms: 1500,
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
        }
    }
}

fn default_rate_limit_backoff_secs() -> u64 {
    30
}

/// Code-search driven discovery
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(rename = "api-base")]
    pub api_base: String,

    #[serde(rename = "raw-base")]
    pub raw_base: String,

    /// Environment variable holding the API token
    #[serde(rename = "token-env")]
    pub token_env: String,

    #[serde(default)]
    pub queries: Vec<String>,

    #[serde(default)]
    pub branches: Vec<String>,

    #[serde(rename = "query-delay-ms")]
    pub query_delay_ms: u64,

    #[serde(rename = "repo-delay-ms")]
    pub repo_delay_ms: u64,

    #[serde(rename = "rate-limit-backoff-secs")]
    pub rate_limit_backoff_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            queries: Vec::new(),
            branches: vec!["main".to_string(), "master".to_string()],
            query_delay_ms: 2000,
            repo_delay_ms: 300,
            rate_limit_backoff_secs: 30,
        }
    }
}

/// Third-party agent registry listing
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Listing endpoint returning `[{name, download_url}, ...]`
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Pause after a rate-limit response before the next document
    #[serde(
        rename = "rate-limit-backoff-secs",
        default = "default_rate_limit_backoff_secs"
    )]
    pub rate_limit_backoff_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            listing_url:
                "https://api.github.com/repos/prassanna-ravishankar/a2a-registry/contents/data"
                    .to_string(),
            delay_ms: 200,
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
        }
    }
}
