//! Subscriber setup for stdout and the run log
//!
//! The two outputs are filtered independently: verbosity flags only change
//! what reaches the console, while the run log always records info and above.

use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter for console output at the given verbosity
pub fn console_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        // Only show errors
        return EnvFilter::new("error");
    }
    match verbose {
        0 => EnvFilter::new("agent_scout=info,warn"),
        1 => EnvFilter::new("agent_scout=debug,info"),
        2 => EnvFilter::new("agent_scout=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Filter for the run log, independent of the console verbosity
pub fn run_log_filter() -> EnvFilter {
    EnvFilter::new("agent_scout=info,warn")
}

/// Builds the subscriber: a console layer without timestamps and an optional
/// timestamped run log layer without ANSI colors.
pub fn build_subscriber<C, F>(
    console: C,
    verbose: u8,
    quiet: bool,
    run_log: Option<F>,
) -> impl Subscriber + Send + Sync + 'static
where
    C: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let console_layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(console)
        .with_filter(console_filter(verbose, quiet));

    let run_log_layer = run_log.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(run_log_filter())
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(run_log_layer)
}

/// Installs the global subscriber writing to stdout and, when given, the run log
pub fn init<F>(verbose: u8, quiet: bool, run_log: Option<F>)
where
    F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    build_subscriber(std::io::stdout, verbose, quiet, run_log).init();
}
