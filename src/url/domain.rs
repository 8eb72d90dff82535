/// Longest hint domain accepted from mined sources
const MAX_DOMAIN_LEN: usize = 100;

/// Checks whether a mined string looks like a concrete host name
///
/// Certificate records carry wildcards, bare labels and the occasional
/// garbage value; only dotted, wildcard-free names shorter than 100
/// characters are kept.
///
/// # Examples
///
/// ```
/// use agent_scout::url::is_plausible_domain;
///
/// assert!(is_plausible_domain("weather-agent.fly.dev"));
/// assert!(!is_plausible_domain("*.fly.dev"));
/// assert!(!is_plausible_domain("localhost"));
/// ```
pub fn is_plausible_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.contains('.')
        && !domain.contains('*')
        && domain.len() < MAX_DOMAIN_LEN
}

/// Turns a hint domain into the base URL probed for it
pub fn domain_base_url(domain: &str) -> String {
    format!("https://{}", domain.trim())
}
