use crate::config::DomainsConfig;
use crate::sources::{Candidate, CandidateSource, Dispatch, SourceContext, SourceResult};
use async_trait::async_trait;

/// Hint domains likely to host agents
pub struct DomainsSource {
    config: DomainsConfig,
}

impl DomainsSource {
    pub fn new(config: DomainsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CandidateSource for DomainsSource {
    fn name(&self) -> &'static str {
        "domains"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Pooled
    }

    async fn candidates(&self, _ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        tracing::info!("Domains: {} hint domains", self.config.domains.len());
        Ok(self
            .config
            .domains
            .iter()
            .map(|domain| Candidate::Domain(domain.clone()))
            .collect())
    }
}
