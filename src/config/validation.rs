use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, PlatformsConfig, SourcesConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates probe engine configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 200 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 200, got {}",
            config.max_workers
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    if config.well_known_paths.is_empty() {
        return Err(ConfigError::Validation(
            "well_known_paths must list at least one path".to_string(),
        ));
    }

    for path in &config.well_known_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "well-known path '{}' must start with '/'",
                path
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    validate_endpoint("contact_url", &config.contact_url)
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.state_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "state_dir cannot be empty".to_string(),
        ));
    }

    if config.registration_script.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "registration_script cannot be empty".to_string(),
        ));
    }

    validate_endpoint("api_url", &config.api_url)
}

/// Validates candidate source settings
fn validate_sources(config: &SourcesConfig) -> Result<(), ConfigError> {
    for url in &config.known.urls {
        validate_endpoint("known url", url)?;
    }

    validate_platform_templates(&config.platforms)?;

    validate_endpoint("ct endpoint", &config.ct.endpoint)?;
    validate_endpoint("github api-base", &config.github.api_base)?;
    validate_endpoint("github raw-base", &config.github.raw_base)?;
    validate_endpoint("registry listing-url", &config.registry.listing_url)?;

    if config.github.token_env.is_empty() {
        return Err(ConfigError::Validation(
            "github token_env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Each template needs exactly one `{}` placeholder for the name prefix
fn validate_platform_templates(config: &PlatformsConfig) -> Result<(), ConfigError> {
    for template in &config.templates {
        if template.matches("{}").count() != 1 {
            return Err(ConfigError::Validation(format!(
                "platform template '{}' must contain exactly one '{{}}' placeholder",
                template
            )));
        }

        validate_endpoint("platform template", &template.replace("{}", "name"))?;
    }

    for prefix in &config.prefixes {
        if prefix.is_empty() || prefix.contains('/') {
            return Err(ConfigError::Validation(format!(
                "platform prefix '{}' is not a valid host label",
                prefix
            )));
        }
    }

    Ok(())
}

/// Requires an absolute http(s) URL
fn validate_endpoint(label: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", label, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            label, value
        )));
    }

    Ok(())
}
