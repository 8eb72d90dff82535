//! Probe engine - discovery orchestration
//!
//! The engine owns the run's dedup store and drives every probe:
//! - Trying the well-known paths of a base URL, marking each checked first
//! - Recording and flushing new discoveries as they are found
//! - Working through candidate sources, sequentially or on a bounded pool
//! - Stopping dispatch once a shutdown is requested

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{build_api_client, validate_card, Fetcher, Shutdown};
use crate::sources::{Candidate, CandidateSource, Dispatch, SourceContext, SourceResult};
use crate::state::{AgentRecord, DedupStore, RunCounters, DEFAULT_PROVENANCE};
use crate::storage::{open_storage, SnapshotStore};
use crate::url::{domain_base_url, normalize_candidate, well_known_url};
use crate::ScoutError;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Drives probes against candidate base URLs
pub struct ProbeEngine {
    fetcher: Fetcher,
    api: Client,
    store: Arc<DedupStore>,
    storage: Arc<dyn SnapshotStore>,
    config: CrawlerConfig,
    shutdown: Arc<Shutdown>,
    flush_lock: Mutex<()>,
    discoveries: Mutex<Option<mpsc::UnboundedSender<AgentRecord>>>,
}

impl ProbeEngine {
    /// Creates an engine over an existing store and storage backend
    ///
    /// # Arguments
    ///
    /// * `config` - The scout configuration
    /// * `store` - Dedup store, possibly rebuilt from a snapshot
    /// * `storage` - Where flushes are written
    ///
    /// # Returns
    ///
    /// * `Ok(ProbeEngine)` - Ready to probe
    /// * `Err(ScoutError)` - The HTTP clients could not be built
    pub fn new(
        config: &Config,
        store: Arc<DedupStore>,
        storage: Arc<dyn SnapshotStore>,
    ) -> Result<Self, ScoutError> {
        Ok(Self {
            fetcher: Fetcher::new(&config.user_agent, config.crawler.timeout())?,
            api: build_api_client(&config.user_agent)?,
            store,
            storage,
            config: config.crawler.clone(),
            shutdown: Arc::new(Shutdown::new()),
            flush_lock: Mutex::new(()),
            discoveries: Mutex::new(None),
        })
    }

    /// Opens the configured state directory and creates an engine over it
    ///
    /// An unusable state directory or a corrupt snapshot is fatal here.
    pub fn open(config: &Config, fresh: bool) -> Result<Self, ScoutError> {
        let (storage, snapshot) = open_storage(&config.output.state_dir, fresh)?;
        let store = Arc::new(DedupStore::from_snapshot(snapshot));
        Self::new(config, store, Arc::new(storage))
    }

    pub fn store(&self) -> &Arc<DedupStore> {
        &self.store
    }

    pub fn counters(&self) -> RunCounters {
        self.store.counters()
    }

    /// Handle used to request a stop from outside the run
    pub fn shutdown(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Returns a stream of newly inserted records
    ///
    /// Only the most recent subscriber receives records.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AgentRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self
            .discoveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    /// Handles passed to candidate sources
    pub fn source_context(&self) -> SourceContext {
        SourceContext {
            api: self.api.clone(),
            fetcher: self.fetcher.clone(),
            store: Arc::clone(&self.store),
            shutdown: Arc::clone(&self.shutdown),
            well_known_paths: self.config.well_known_paths.clone(),
        }
    }

    /// Probes a base URL for an agent card
    pub async fn probe(&self, base: &str) -> Option<AgentRecord> {
        self.probe_with_source(base, DEFAULT_PROVENANCE).await
    }

    /// Probes a base URL, tagging any record with `source`
    ///
    /// # Probe Flow
    ///
    /// For each well-known path, in order:
    /// 1. Skip it if already checked, otherwise mark it checked
    /// 2. Fetch it; network failures and non-200 statuses move to the next path
    /// 3. Validate the body; a non-card moves to the next path
    /// 4. Record the card, flush and emit it if it is new, and stop
    ///
    /// # Returns
    ///
    /// * `Some(AgentRecord)` - A card was found, whether or not its identifier
    ///   was already known
    /// * `None` - No unchecked path yielded a card, or the candidate is not a
    ///   valid http(s) URL
    pub async fn probe_with_source(&self, base: &str, source: &str) -> Option<AgentRecord> {
        let base = match normalize_candidate(base) {
            Ok(base) => base,
            Err(e) => {
                tracing::debug!("Skipping candidate {:?}: {}", base, e);
                return None;
            }
        };

        for path in &self.config.well_known_paths {
            if self.shutdown.is_triggered() {
                return None;
            }

            let card_url = well_known_url(&base, path);
            if !self.store.mark_checked(&card_url) {
                continue;
            }

            let response = match self.fetcher.fetch(&card_url).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("{} -> {}", card_url, e.tag());
                    continue;
                }
            };

            if !response.has_document() {
                tracing::trace!("{} -> HTTP {}", card_url, response.status);
                continue;
            }

            let Some(card) = validate_card(&response.body) else {
                tracing::trace!("{} -> not an agent card", card_url);
                continue;
            };

            let record = AgentRecord::from_card(card, &base, &card_url, source);
            if self.store.insert_if_absent(record.clone()) {
                tracing::info!(
                    "FOUND: {} ({} skills) -> {}",
                    record.name,
                    record.skills_count,
                    record.url
                );
                self.flush();
                self.emit(&record);
            } else {
                tracing::debug!("Already known: {} [{}]", record.name, record.id);
            }
            return Some(record);
        }

        None
    }

    /// Probes one candidate produced by a source
    pub async fn probe_candidate(&self, candidate: &Candidate, source: &str) -> Option<AgentRecord> {
        match candidate {
            Candidate::Url(url) => self.probe_with_source(url, source).await,
            Candidate::Domain(domain) => {
                self.probe_with_source(&domain_base_url(domain), source).await
            }
            Candidate::FirstOf(urls) => {
                for url in urls {
                    if self.shutdown.is_triggered() {
                        break;
                    }
                    if let Some(record) = self.probe_with_source(url, source).await {
                        return Some(record);
                    }
                }
                None
            }
        }
    }

    /// Writes a snapshot of the current state
    ///
    /// Flushes are serialized. A failed write is logged and reported as
    /// `false`; the next successful flush carries the lost update.
    pub fn flush(&self) -> bool {
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.store.snapshot();

        match self.storage.save(&snapshot) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save crawl state: {}", e);
                false
            }
        }
    }

    fn emit(&self, record: &AgentRecord) {
        let mut sender = self
            .discoveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(tx) = sender.as_ref() {
            if tx.send(record.clone()).is_err() {
                // Receiver dropped
                *sender = None;
            }
        }
    }

    /// Runs a single candidate source to completion
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of new agents the source produced
    /// * `Err(SourceError)` - The source could not produce candidates
    pub async fn run_source(self: &Arc<Self>, source: &dyn CandidateSource) -> SourceResult<u64> {
        let name = source.name();
        tracing::info!("━━━ STRATEGY: {} ━━━", name);

        let found_before = self.store.counters().found_this_run;
        let candidates = source.candidates(&self.source_context()).await?;
        tracing::info!("{}: {} candidates", name, candidates.len());

        match source.dispatch() {
            Dispatch::Sequential => self.run_sequential(name, candidates).await,
            Dispatch::Pooled => self.run_pooled(name, candidates).await,
        }

        let found = self
            .store
            .counters()
            .found_this_run
            .saturating_sub(found_before);
        tracing::info!("{}: done, {} new agents", name, found);
        self.flush();

        Ok(found)
    }

    /// Runs sources in order; a failing source is logged and skipped
    pub async fn run_sources(self: &Arc<Self>, sources: &[Box<dyn CandidateSource>]) {
        for source in sources {
            if self.shutdown.is_triggered() {
                tracing::info!("Stop requested, skipping remaining strategies");
                break;
            }

            if let Err(e) = self.run_source(source.as_ref()).await {
                tracing::warn!("{} failed: {}", source.name(), e);
            }
        }

        self.flush();
    }

    async fn run_sequential(&self, name: &'static str, candidates: Vec<Candidate>) {
        for candidate in &candidates {
            if self.shutdown.is_triggered() {
                tracing::info!("{}: stop requested", name);
                break;
            }
            self.probe_candidate(candidate, name).await;
        }
    }

    /// Probes candidates on at most `max-workers` concurrent tasks
    async fn run_pooled(self: &Arc<Self>, name: &'static str, candidates: Vec<Candidate>) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers as usize));
        let completed = Arc::new(AtomicUsize::new(0));
        let interval = self.config.progress_interval.max(1) as usize;
        let total = candidates.len();
        let mut workers = JoinSet::new();

        for candidate in candidates {
            if self.shutdown.is_triggered() {
                break;
            }

            let permit = tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = self.shutdown.triggered() => break,
            };

            let engine = Arc::clone(self);
            let completed = Arc::clone(&completed);
            workers.spawn(async move {
                engine.probe_candidate(&candidate, name).await;
                drop(permit);

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if done % interval == 0 {
                    tracing::info!(
                        "{}: progress {}/{}, {} found this run",
                        name,
                        done,
                        total,
                        engine.store.counters().found_this_run
                    );
                    engine.flush();
                }
            });
        }

        if self.shutdown.is_triggered() {
            tracing::info!("{}: stop requested, waiting for in-flight probes", name);
        }

        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Probe task failed: {}", e);
            }
        }
    }
}
