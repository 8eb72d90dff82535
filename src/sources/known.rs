use crate::config::KnownConfig;
use crate::sources::{Candidate, CandidateSource, Dispatch, SourceContext, SourceResult};
use async_trait::async_trait;

/// Base URLs known to publish agent cards
pub struct KnownSource {
    config: KnownConfig,
}

impl KnownSource {
    pub fn new(config: KnownConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CandidateSource for KnownSource {
    fn name(&self) -> &'static str {
        "known"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Sequential
    }

    async fn candidates(&self, _ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        tracing::info!("Known: {} base URLs", self.config.urls.len());
        Ok(self
            .config
            .urls
            .iter()
            .map(|url| Candidate::Url(url.clone()))
            .collect())
    }
}
