//! Brute-force candidates on hosting platforms
//!
//! Agents are commonly deployed under a predictable subdomain of a hosting
//! platform (`weather-agent.vercel.app`, `a2a-demo.fly.dev`). This source
//! crosses a list of name prefixes with the platform URL templates.

use crate::config::PlatformsConfig;
use crate::sources::{Candidate, CandidateSource, Dispatch, SourceContext, SourceResult};
use async_trait::async_trait;

pub struct PlatformsSource {
    config: PlatformsConfig,
}

impl PlatformsSource {
    pub fn new(config: PlatformsConfig) -> Self {
        Self { config }
    }
}

/// Substitutes a name into a platform template's `{}` placeholder
///
/// # Examples
///
/// ```
/// use agent_scout::sources::expand_template;
///
/// assert_eq!(
///     expand_template("https://{}.vercel.app", "a2a-agent"),
///     "https://a2a-agent.vercel.app"
/// );
/// ```
pub fn expand_template(template: &str, name: &str) -> String {
    template.replacen("{}", name, 1)
}

#[async_trait]
impl CandidateSource for PlatformsSource {
    fn name(&self) -> &'static str {
        "platforms"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Pooled
    }

    async fn candidates(&self, _ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        let candidates: Vec<Candidate> = self
            .config
            .prefixes
            .iter()
            .flat_map(|prefix| {
                self.config
                    .templates
                    .iter()
                    .map(move |template| Candidate::Url(expand_template(template, prefix)))
            })
            .collect();

        tracing::info!(
            "Platforms: {} prefixes x {} platforms = {} URLs",
            self.config.prefixes.len(),
            self.config.templates.len(),
            candidates.len()
        );

        Ok(candidates)
    }
}
