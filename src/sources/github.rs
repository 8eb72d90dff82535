//! Code-search driven discovery
//!
//! Code search finds repositories that contain agent cards or mention the
//! protocol. Each repository then yields deployment candidates: its declared
//! homepage, its Pages site when enabled, and the declared `url` of any agent
//! card committed at a well-known path on a default branch.

use crate::config::GithubConfig;
use crate::crawler::validate_card;
use crate::sources::{
    fetch_json, token_from_env, Candidate, CandidateSource, Dispatch, SourceContext, SourceError,
    SourceResult,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const REPO_TIMEOUT: Duration = Duration::from_secs(8);
const API_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    repository: Option<RepositoryRef>,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryMeta {
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    has_pages: bool,
}

pub struct GithubSource {
    config: GithubConfig,
    token: Option<String>,
}

impl GithubSource {
    pub fn new(config: GithubConfig, token: Option<String>) -> Self {
        Self { config, token }
    }

    /// Reads the API token from the configured environment variable
    pub fn from_env(config: GithubConfig) -> Self {
        let token = token_from_env(&config.token_env);
        Self::new(config, token)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, API_ACCEPT)
    }

    /// Runs every search query and collects repository full names
    async fn search_repositories(&self, ctx: &SourceContext, token: &str) -> BTreeSet<String> {
        let delay = Duration::from_millis(self.config.query_delay_ms);
        let backoff = Duration::from_secs(self.config.rate_limit_backoff_secs);
        let mut repos = BTreeSet::new();

        for (i, query) in self.config.queries.iter().enumerate() {
            if i > 0 && !ctx.shutdown.pause(delay).await {
                break;
            }

            // Queries are kept pre-encoded, `+` separating terms
            let url = self.api_url(&format!("/search/code?q={}&per_page=100", query));
            tracing::info!("GitHub: searching '{}'", query.replace('+', " "));

            let request = self.authorized(ctx.api.get(&url), token).timeout(SEARCH_TIMEOUT);
            match fetch_json::<SearchResponse>(request, &url).await {
                Ok(response) => {
                    tracing::info!(
                        "  -> {} results, processing {}",
                        response.total_count,
                        response.items.len()
                    );
                    repos.extend(
                        response
                            .items
                            .into_iter()
                            .filter_map(|item| item.repository)
                            .map(|repo| repo.full_name)
                            .filter(|name| !name.is_empty()),
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

        repos
    }

    /// Base URLs worth probing for one repository, most specific first
    async fn repository_candidates(
        &self,
        ctx: &SourceContext,
        token: &str,
        repo: &str,
    ) -> SourceResult<Vec<String>> {
        let url = self.api_url(&format!("/repos/{}", repo));
        let request = self.authorized(ctx.api.get(&url), token).timeout(REPO_TIMEOUT);
        let meta: RepositoryMeta = fetch_json(request, &url).await?;

        let mut candidates = Vec::new();

        if let Some(homepage) = meta.homepage.as_deref().filter(|h| h.starts_with("http")) {
            candidates.push(homepage.trim_end_matches('/').to_string());
        }

        if meta.has_pages {
            if let Some((owner, name)) = repo.split_once('/') {
                candidates.push(format!("https://{}.github.io/{}", owner, name));
                candidates.push(format!("https://{}.github.io", owner));
            }
        }

        candidates.extend(self.committed_card_urls(ctx, repo).await);
        Ok(candidates)
    }

    /// Declared URLs of agent cards committed to the repository
    ///
    /// Raw file URLs go through the checked set like any probe URL.
    async fn committed_card_urls(&self, ctx: &SourceContext, repo: &str) -> Vec<String> {
        let raw_base = self.config.raw_base.trim_end_matches('/');
        let mut urls = Vec::new();

        for branch in &self.config.branches {
            for path in &ctx.well_known_paths {
                let raw = format!(
                    "{}/{}/{}/{}",
                    raw_base,
                    repo,
                    branch,
                    path.trim_start_matches('/')
                );
                if !ctx.store.mark_checked(&raw) {
                    continue;
                }

                let response = match ctx.fetcher.fetch(&raw).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::debug!("{} -> {}", raw, e.tag());
                        continue;
                    }
                };
                if !response.has_document() {
                    continue;
                }

                if let Some(card) = validate_card(&response.body) {
                    tracing::info!("  {} in {} (checking deployment...)", card.name, repo);
                    if let Some(url) = card.url.as_deref().filter(|u| u.starts_with("http")) {
                        urls.push(url.trim_end_matches('/').to_string());
                    }
                }
            }
        }

        urls
    }
}

#[async_trait]
impl CandidateSource for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Sequential
    }

    async fn candidates(&self, ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| SourceError::MissingCredentials(self.config.token_env.clone()))?;

        let repos = self.search_repositories(ctx, token).await;
        tracing::info!(
            "GitHub: found {} unique repos, checking deployments...",
            repos.len()
        );

        let delay = Duration::from_millis(self.config.repo_delay_ms);
        let mut candidates = Vec::new();

        for (i, repo) in repos.iter().enumerate() {
            if i > 0 && !ctx.shutdown.pause(delay).await {
                break;
            }

            match self.repository_candidates(ctx, token, repo).await {
                Ok(urls) if !urls.is_empty() => candidates.push(Candidate::FirstOf(urls)),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping {}: {}", repo, e),
            }
        }

        Ok(candidates)
    }
}
