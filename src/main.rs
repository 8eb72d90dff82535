//! Agent Scout main entry point
//!
//! This is the command-line interface for the Agent Scout discovery crawler.

use agent_scout::config::{load_config_with_hash, Config};
use agent_scout::output::{print_summary, write_registration_script};
use agent_scout::sources::{build_sources, STRATEGY_NAMES};
use agent_scout::state::RunCounters;
use agent_scout::storage::{FileStorage, SnapshotStore, LOG_FILE};
use agent_scout::ProbeEngine;
use anyhow::Context;
use clap::Parser;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Agent Scout: a resumable agent card discovery crawler
///
/// Agent Scout probes candidate hosts for agent cards published at
/// well-known paths. Candidates come from a set of strategies; progress is
/// persisted so an interrupted crawl resumes without refetching any URL.
#[derive(Parser, Debug)]
#[command(name = "agent-scout")]
#[command(version = "1.0.0")]
#[command(about = "A resumable agent card discovery crawler", long_about = None)]
struct Cli {
    /// Strategies to run (known, registry, github, ct, platforms, domains); all when omitted
    #[arg(value_name = "STRATEGY")]
    strategies: Vec<String>,

    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start from empty state, ignoring persisted progress
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be probed without probing
    #[arg(long, conflicts_with_all = ["stats", "register"])]
    dry_run: bool,

    /// Show the persisted discoveries and exit
    #[arg(long, conflicts_with_all = ["dry_run", "register"])]
    stats: bool,

    /// Render the registration script from persisted discoveries and exit
    #[arg(long, value_name = "API_URL", conflicts_with_all = ["dry_run", "stats"])]
    register: Option<Option<String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, config_hash) =
        load_config_with_hash(cli.config.as_deref()).context("Failed to load configuration")?;

    let crawling = !cli.dry_run && !cli.stats && cli.register.is_none();
    let log_file = if crawling {
        Some(open_log_file(&config)?)
    } else {
        None
    };
    agent_scout::logging::init(cli.verbose, cli.quiet, log_file.map(Mutex::new));

    match &cli.config {
        Some(path) => tracing::info!("Configuration loaded from {}", path.display()),
        None => tracing::info!("Using built-in configuration"),
    }
    tracing::debug!("Configuration hash: {}", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.strategies)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(api_url) = cli.register {
        handle_register(&config, api_url)
    } else {
        handle_crawl(&config, &cli.strategies, cli.fresh).await
    }
}

/// Opens the append-only run log in the state directory
fn open_log_file(config: &Config) -> anyhow::Result<File> {
    let dir = &config.output.state_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create state directory {}", dir.display()))?;

    let path = dir.join(LOG_FILE);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Cannot open run log {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be probed
fn handle_dry_run(config: &Config, strategies: &[String]) -> anyhow::Result<()> {
    let sources = build_sources(config, strategies)?;

    println!("=== Agent Scout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Progress interval: {}", config.crawler.progress_interval);
    println!("  Well-known paths:");
    for path in &config.crawler.well_known_paths {
        println!("    * {}", path);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  State directory: {}", config.output.state_dir.display());
    println!(
        "  Registration script: {}",
        config.output.registration_script.display()
    );
    println!("  API URL: {}", config.output.api_url);

    let s = &config.sources;
    println!("\nStrategies:");
    for source in &sources {
        let detail = match source.name() {
            "known" => format!("{} base URLs", s.known.urls.len()),
            "registry" => format!("listing {}", s.registry.listing_url),
            "github" => format!(
                "{} queries, token from ${}",
                s.github.queries.len(),
                s.github.token_env
            ),
            "ct" => format!("{} terms against {}", s.ct.terms.len(), s.ct.endpoint),
            "platforms" => format!(
                "{} prefixes x {} platforms = {} URLs",
                s.platforms.prefixes.len(),
                s.platforms.templates.len(),
                s.platforms.prefixes.len() * s.platforms.templates.len()
            ),
            "domains" => format!("{} hint domains", s.domains.domains.len()),
            _ => String::new(),
        };
        println!("  - {:<10} {}", source.name(), detail);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would run {} of {} strategies",
        sources.len(),
        STRATEGY_NAMES.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows the persisted discoveries
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let storage = FileStorage::new(&config.output.state_dir)?;
    println!("State directory: {}", storage.dir().display());

    let Some(snapshot) = storage.load()? else {
        println!("No crawl state found");
        return Ok(());
    };

    println!("Last updated: {}", snapshot.last_updated.to_rfc3339());
    let counters = RunCounters {
        total_checked: snapshot.total_checked() as u64,
        total_discovered: snapshot.total_discovered() as u64,
        ..RunCounters::default()
    };
    print_summary(&counters, &snapshot.discovered);

    Ok(())
}

/// Handles the --register mode: renders the registration script
fn handle_register(config: &Config, api_url: Option<String>) -> anyhow::Result<()> {
    let api_url = api_url
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| config.output.api_url.clone());

    let storage = FileStorage::new(&config.output.state_dir)?;
    let records = storage
        .load()?
        .map(|snapshot| snapshot.discovered)
        .unwrap_or_default();

    write_registration_script(&config.output.registration_script, &records, &api_url)?;
    println!(
        "Register: bash {} [API_URL]",
        config.output.registration_script.display()
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, strategies: &[String], fresh: bool) -> anyhow::Result<()> {
    let sources = build_sources(config, strategies)?;
    let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
    tracing::info!("Strategies: {}", names.join(", "));

    let engine = Arc::new(
        ProbeEngine::open(config, fresh).context("Failed to initialize crawl state")?,
    );

    let shutdown = engine.shutdown();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted! Finishing in-flight probes and saving...");
            shutdown.trigger();
        }
    });

    engine.run_sources(&sources).await;

    if !engine.flush() {
        tracing::error!("Final save failed; the last discoveries may not be persisted");
    }

    let records = engine.store().discovered();
    print_summary(&engine.counters(), &records);

    write_registration_script(
        &config.output.registration_script,
        &records,
        &config.output.api_url,
    )?;
    println!(
        "Register: bash {} [API_URL]",
        config.output.registration_script.display()
    );

    Ok(())
}
