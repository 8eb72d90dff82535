//! Certificate-transparency mining
//!
//! Queries a CT log search endpoint for certificate names matching agent-like
//! patterns and turns every plausible host name into a hint domain.

use crate::config::CtConfig;
use crate::sources::{
    fetch_json, Candidate, CandidateSource, Dispatch, SourceContext, SourceError, SourceResult,
};
use crate::url::is_plausible_domain;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Certificate fields that carry domain names, newline separated
const DOMAIN_FIELDS: &[&str] = &["common_name", "name_value"];

pub struct CtSource {
    config: CtConfig,
}

impl CtSource {
    pub fn new(config: CtConfig) -> Self {
        Self { config }
    }

    fn query_url(&self, term: &str) -> SourceResult<Url> {
        Url::parse_with_params(&self.config.endpoint, &[("q", term), ("output", "json")]).map_err(
            |e| SourceError::Parse {
                url: self.config.endpoint.clone(),
                message: e.to_string(),
            },
        )
    }
}

/// Collects plausible domain names from certificate records
pub fn extract_cert_domains(certs: &[Value]) -> BTreeSet<String> {
    let mut domains = BTreeSet::new();

    for cert in certs {
        for field in DOMAIN_FIELDS {
            let Some(value) = cert.get(*field).and_then(Value::as_str) else {
                continue;
            };
            for name in value.split('\n').map(str::trim) {
                if is_plausible_domain(name) {
                    domains.insert(name.to_string());
                }
            }
        }
    }

    domains
}

#[async_trait]
impl CandidateSource for CtSource {
    fn name(&self) -> &'static str {
        "ct"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Pooled
    }

    async fn candidates(&self, ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let delay = Duration::from_millis(self.config.delay_ms);
        let backoff = Duration::from_secs(self.config.rate_limit_backoff_secs);
        let mut domains = BTreeSet::new();

        for (i, term) in self.config.terms.iter().enumerate() {
            if i > 0 && !ctx.shutdown.pause(delay).await {
                break;
            }

            let url = self.query_url(term)?;
            tracing::info!("CT: '{}'", term);

            let request = ctx.api.get(url.as_str()).timeout(timeout);
            match fetch_json::<Vec<Value>>(request, url.as_str()).await {
                Ok(certs) => {
                    domains.extend(extract_cert_domains(&certs));
                    tracing::info!(
                        "  -> {} certs, {} domains so far",
                        certs.len(),
                        domains.len()
                    );
                }
                Err(SourceError::RateLimited { .. }) => {
                    tracing::warn!("  -> Rate limited, backing off {}s", backoff.as_secs());
                    if !ctx.shutdown.pause(backoff).await {
                        break;
                    }
                }
                Err(e) => tracing::warn!("  -> {}", e),
            }
        }

        tracing::info!("CT: {} unique domains to check", domains.len());
        Ok(domains.into_iter().map(Candidate::Domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::test_support;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_extract_cert_domains_filters_and_sorts() {
        let certs = vec![
            json!({"common_name": "b-agent.fly.dev", "name_value": "b-agent.fly.dev\n*.fly.dev"}),
            json!({"common_name": "a-agent.vercel.app", "name_value": "localhost\n\n"}),
            json!({"common_name": null, "issuer": "x"}),
        ];

        let domains: Vec<String> = extract_cert_domains(&certs).into_iter().collect();
        assert_eq!(domains, vec!["a-agent.vercel.app", "b-agent.fly.dev"]);
    }

    #[tokio::test]
    async fn test_queries_every_term_and_survives_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "%-agent.fly.dev"))
            .and(query_param("output", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"common_name": "weather-agent.fly.dev", "name_value": "weather-agent.fly.dev"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "a2a-%.vercel.app"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let source = CtSource::new(CtConfig {
            endpoint: format!("{}/", server.uri()),
            terms: vec!["a2a-%.vercel.app".to_string(), "%-agent.fly.dev".to_string()],
            timeout_secs: 5,
            delay_ms: 0,
            rate_limit_backoff_secs: 0,
        });

        let candidates = source.candidates(&test_support::context()).await.unwrap();
        assert_eq!(
            candidates,
            vec![Candidate::Domain("weather-agent.fly.dev".to_string())]
        );
    }

    #[tokio::test]
    async fn test_rate_limited_term_backs_off_and_continues() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "first"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"common_name": "late-agent.fly.dev"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let source = CtSource::new(CtConfig {
            endpoint: format!("{}/", server.uri()),
            terms: vec!["first".to_string(), "second".to_string()],
            timeout_secs: 5,
            delay_ms: 0,
            rate_limit_backoff_secs: 1,
        });

        let started = std::time::Instant::now();
        let candidates = source.candidates(&test_support::context()).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(
            candidates,
            vec![Candidate::Domain("late-agent.fly.dev".to_string())]
        );
    }

    #[tokio::test]
    async fn test_shutdown_during_backoff_stops_queries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "first"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("q", "second"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let source = CtSource::new(CtConfig {
            endpoint: format!("{}/", server.uri()),
            terms: vec!["first".to_string(), "second".to_string()],
            timeout_secs: 5,
            delay_ms: 0,
            rate_limit_backoff_secs: 30,
        });

        let ctx = test_support::context();
        let shutdown = std::sync::Arc::clone(&ctx.shutdown);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            shutdown.trigger();
        });

        let candidates = source.candidates(&ctx).await.unwrap();
        assert!(candidates.is_empty());
    }
}
