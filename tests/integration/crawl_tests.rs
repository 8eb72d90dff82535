//! Integration tests for the probe engine
//!
//! These tests use wiremock to create mock HTTP servers and exercise probing,
//! deduplication, persistence and resumption end-to-end.

use agent_scout::config::{parse_config, Config};
use agent_scout::sources::{
    build_sources, Candidate, CandidateSource, Dispatch, SourceContext, SourceError, SourceResult,
};
use agent_scout::state::{agent_id, DedupStore};
use agent_scout::storage::{FileStorage, SnapshotStore};
use agent_scout::ProbeEngine;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AGENT_PATH: &str = "/.well-known/agent.json";
const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";

/// Creates a test configuration with a short timeout and the given known URLs
fn create_test_config(state_dir: &Path, known: &[String]) -> Config {
    let urls = known
        .iter()
        .map(|u| format!("\"{}\"", u))
        .collect::<Vec<_>>()
        .join(", ");

    parse_config(&format!(
        r#"
[crawler]
timeout-secs = 1
max-workers = 4
well-known-paths = ["{agent}", "{card}"]
progress-interval = 2

[user-agent]
crawler-name = "TestScout"
crawler-version = "1.0"
contact-url = "https://example.com/about"

[output]
state-dir = "{dir}"
registration-script = "{dir}/register-discovered.sh"
api-url = "https://api.example.test"

[sources.known]
urls = [{urls}]
"#,
        agent = AGENT_PATH,
        card = AGENT_CARD_PATH,
        dir = state_dir.display(),
        urls = urls
    ))
    .unwrap()
}

fn open_engine(config: &Config) -> Arc<ProbeEngine> {
    Arc::new(ProbeEngine::open(config, false).unwrap())
}

fn echo_card() -> serde_json::Value {
    json!({
        "name": "Echo",
        "protocolVersion": "0.3.0",
        "skills": [{"id": "s1"}],
        "url": "https://example.test"
    })
}

async fn mount_status(server: &MockServer, card_path: &str, status: u16, expect: u64) {
    Mock::given(method("GET"))
        .and(path(card_path))
        .respond_with(ResponseTemplate::new(status))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_card(server: &MockServer, card_path: &str, body: serde_json::Value, expect: u64) {
    Mock::given(method("GET"))
        .and(path(card_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expect)
        .mount(server)
        .await;
}

/// Candidate source with fixed candidates, for driving the engine directly
struct FixedSource {
    name: &'static str,
    dispatch: Dispatch,
    candidates: Vec<Candidate>,
}

#[async_trait]
impl CandidateSource for FixedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    async fn candidates(&self, _ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

/// Candidate source whose upstream always fails
struct FailingSource;

#[async_trait]
impl CandidateSource for FailingSource {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn dispatch(&self) -> Dispatch {
        Dispatch::Sequential
    }

    async fn candidates(&self, _ctx: &SourceContext) -> SourceResult<Vec<Candidate>> {
        Err(SourceError::MissingCredentials("SCOUT_TEST_TOKEN".to_string()))
    }
}

#[tokio::test]
async fn test_end_to_end_probe_records_agent() {
    let server = MockServer::start().await;
    mount_card(&server, AGENT_PATH, echo_card(), 1).await;
    mount_status(&server, AGENT_CARD_PATH, 404, 0).await;

    let dir = TempDir::new().unwrap();
    let engine = open_engine(&create_test_config(dir.path(), &[]));

    let record = engine.probe(&server.uri()).await.unwrap();

    assert_eq!(record.id, agent_id("echo", "https://example.test"));
    assert_eq!(record.id, "1151f81a5612");
    assert_eq!(record.skills_count, 1);
    assert_eq!(record.url, "https://example.test");
    assert_eq!(record.agent_card_url, format!("{}{}", server.uri(), AGENT_PATH));
    assert_eq!(record.protocol_version.as_deref(), Some("0.3.0"));
    assert_eq!(engine.store().discovered().len(), 1);

    // The discovery was flushed as soon as it was recorded
    let persisted = FileStorage::new(dir.path()).unwrap().load().unwrap().unwrap();
    assert_eq!(persisted.discovered.len(), 1);
}

#[tokio::test]
async fn test_reprobe_with_checked_paths_makes_no_requests() {
    let server = MockServer::start().await;
    mount_card(&server, AGENT_PATH, echo_card(), 0).await;
    mount_card(&server, AGENT_CARD_PATH, echo_card(), 0).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[]);
    let store = Arc::new(DedupStore::new());
    store.mark_checked(&format!("{}{}", server.uri(), AGENT_PATH));
    store.mark_checked(&format!("{}{}", server.uri(), AGENT_CARD_PATH));

    let storage = Arc::new(FileStorage::new(dir.path()).unwrap());
    let engine = ProbeEngine::new(&config, Arc::clone(&store), storage).unwrap();

    assert!(engine.probe(&server.uri()).await.is_none());
    assert!(engine.probe(&format!("{}/", server.uri())).await.is_none());
    assert!(store.discovered().is_empty());
}

#[tokio::test]
async fn test_same_agent_on_two_hosts_has_one_entry() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_card(&first, AGENT_PATH, echo_card(), 1).await;
    mount_card(&second, AGENT_PATH, echo_card(), 1).await;

    let dir = TempDir::new().unwrap();
    let engine = open_engine(&create_test_config(dir.path(), &[]));

    let a = engine.probe(&first.uri()).await.unwrap();
    let b = engine.probe(&second.uri()).await.unwrap();

    assert_eq!(a.id, b.id);
    let discovered = engine.store().discovered();
    assert_eq!(discovered.len(), 1);
    // First seen wins
    assert_eq!(discovered[0].agent_card_url, a.agent_card_url);
}

#[tokio::test]
async fn test_concurrent_probes_fetch_each_path_once() {
    let server = MockServer::start().await;
    mount_status(&server, AGENT_PATH, 404, 1).await;
    Mock::given(method("GET"))
        .and(path(AGENT_CARD_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(echo_card())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = open_engine(&create_test_config(dir.path(), &[]));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let base = server.uri();
            tokio::spawn(async move { engine.probe(&base).await })
        })
        .collect();

    let mut found = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            found += 1;
        }
    }

    assert_eq!(found, 1);
    assert_eq!(engine.store().discovered().len(), 1);
    assert_eq!(engine.counters().checked_this_run, 2);
}

#[tokio::test]
async fn test_unresponsive_server_times_out_and_is_checked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(echo_card())
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let engine = open_engine(&create_test_config(dir.path(), &[]));

    let started = std::time::Instant::now();
    assert!(engine.probe(&server.uri()).await.is_none());
    assert!(started.elapsed() < Duration::from_secs(4));

    assert!(engine
        .store()
        .is_checked(&format!("{}{}", server.uri(), AGENT_PATH)));
    assert!(engine
        .store()
        .is_checked(&format!("{}{}", server.uri(), AGENT_CARD_PATH)));
}

#[tokio::test]
async fn test_resume_restores_state_and_skips_checked_urls() {
    let found = MockServer::start().await;
    mount_card(&found, AGENT_PATH, echo_card(), 1).await;
    let empty = MockServer::start().await;
    mount_status(&empty, AGENT_PATH, 404, 1).await;
    mount_status(&empty, AGENT_CARD_PATH, 404, 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[found.uri(), empty.uri()]);
    let sources = build_sources(&config, &["known".to_string()]).unwrap();

    let first_run = open_engine(&config);
    first_run.run_sources(&sources).await;
    let before = first_run.store().snapshot();
    assert_eq!(before.total_checked(), 3);
    assert_eq!(before.total_discovered(), 1);
    assert_eq!(before.discovered[0].source, "known");
    drop(first_run);

    let checked_file = std::fs::read_to_string(dir.path().join("crawl-checked.txt")).unwrap();
    assert_eq!(checked_file.lines().count(), 3);

    let second_run = open_engine(&config);
    let after = second_run.store().snapshot();
    assert_eq!(after.checked, before.checked);
    assert_eq!(after.discovered, before.discovered);

    // Same batch again: nothing new is checked or fetched
    second_run.run_sources(&sources).await;
    let counters = second_run.counters();
    assert_eq!(counters.checked_this_run, 0);
    assert_eq!(counters.found_this_run, 0);
    assert_eq!(counters.total_checked, 3);
}

#[tokio::test]
async fn test_discovery_lost_when_marked_but_not_recorded() {
    // Simulates a crash after marking the path checked but before the record
    // was saved. The mark-before-fetch order trades this loss for never
    // fetching a URL twice.
    let server = MockServer::start().await;
    mount_card(&server, AGENT_PATH, echo_card(), 0).await;
    mount_status(&server, AGENT_CARD_PATH, 404, 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[]);
    let storage = FileStorage::new(dir.path()).unwrap();

    let crashed = DedupStore::new();
    crashed.mark_checked(&format!("{}{}", server.uri(), AGENT_PATH));
    storage.save(&crashed.snapshot()).unwrap();

    let engine = open_engine(&config);
    assert!(engine.probe(&server.uri()).await.is_none());
    assert!(engine.store().discovered().is_empty());
}

#[tokio::test]
async fn test_failing_source_does_not_abort_run() {
    let server = MockServer::start().await;
    mount_card(&server, AGENT_PATH, echo_card(), 1).await;

    let dir = TempDir::new().unwrap();
    let engine = open_engine(&create_test_config(dir.path(), &[]));

    let sources: Vec<Box<dyn CandidateSource>> = vec![
        Box::new(FailingSource),
        Box::new(FixedSource {
            name: "fixed",
            dispatch: Dispatch::Sequential,
            candidates: vec![Candidate::Url(server.uri())],
        }),
    ];
    engine.run_sources(&sources).await;

    let discovered = engine.store().discovered();
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].source, "fixed");
}

#[tokio::test]
async fn test_pooled_source_probes_every_candidate() {
    let server = MockServer::start().await;
    let mut candidates = vec![Candidate::Url("not a url".to_string())];

    for i in 0..6 {
        mount_card(
            &server,
            &format!("/agent{}{}", i, AGENT_PATH),
            json!({"name": format!("Agent {}", i), "skills": []}),
            1,
        )
        .await;
        candidates.push(Candidate::Url(format!("{}/agent{}", server.uri(), i)));
    }

    let dir = TempDir::new().unwrap();
    let engine = open_engine(&create_test_config(dir.path(), &[]));
    let mut discoveries = engine.subscribe();

    let source = FixedSource {
        name: "pooled",
        dispatch: Dispatch::Pooled,
        candidates,
    };
    let found = engine.run_source(&source).await.unwrap();

    assert_eq!(found, 6);
    assert_eq!(engine.store().discovered().len(), 6);
    assert!(engine
        .store()
        .discovered()
        .iter()
        .all(|record| record.source == "pooled"));

    let mut streamed = 0;
    while discoveries.try_recv().is_ok() {
        streamed += 1;
    }
    assert_eq!(streamed, 6);
}

#[tokio::test]
async fn test_shutdown_stops_dispatch_and_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(echo_card()))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[server.uri()]);
    let engine = open_engine(&config);
    engine.shutdown().trigger();

    let sources = build_sources(&config, &["known".to_string()]).unwrap();
    engine.run_sources(&sources).await;

    assert_eq!(engine.counters().total_checked, 0);
    // The final flush still ran
    assert!(dir.path().join("crawl-discovered.json").exists());
}

#[tokio::test]
async fn test_fresh_start_ignores_persisted_state() {
    let server = MockServer::start().await;
    mount_card(&server, AGENT_PATH, echo_card(), 2).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[]);

    let first = open_engine(&config);
    assert!(first.probe(&server.uri()).await.is_some());
    drop(first);

    let fresh = Arc::new(ProbeEngine::open(&config, true).unwrap());
    assert_eq!(fresh.counters().total_checked, 0);
    assert!(fresh.probe(&server.uri()).await.is_some());
}
