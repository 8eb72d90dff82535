use crate::UrlError;
use url::Url;

/// Normalizes a candidate base URL
///
/// Candidate URLs are compared by exact text, so normalization is deliberately
/// narrow:
///
/// 1. Trim surrounding whitespace
/// 2. Strip every trailing `/`
/// 3. Require an absolute `http`/`https` URL with a host
///
/// Case, query and path are left as given.
///
/// # Examples
///
/// ```
/// use agent_scout::url::normalize_candidate;
///
/// let url = normalize_candidate("https://example.test/").unwrap();
/// assert_eq!(url, "https://example.test");
/// ```
pub fn normalize_candidate(candidate: &str) -> Result<String, UrlError> {
    let trimmed = candidate.trim().trim_end_matches('/');

    let parsed = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(trimmed.to_string())
}

/// Joins a normalized base URL with a well-known suffix path
///
/// ```
/// use agent_scout::url::well_known_url;
///
/// assert_eq!(
///     well_known_url("https://example.test", "/.well-known/agent.json"),
///     "https://example.test/.well-known/agent.json"
/// );
/// ```
pub fn well_known_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url, path)
}
