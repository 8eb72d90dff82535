//! Run summary rendering

use crate::state::{AgentRecord, RunCounters};
use std::fmt::Write as _;

const WIDTH: usize = 64;
const NAME_WIDTH: usize = 40;

/// Formats the run counters followed by one line per discovered agent
///
/// # Arguments
///
/// * `counters` - Counters of the run
/// * `records` - Every discovered agent, in discovery order
///
/// # Returns
///
/// The summary as a multi-line string
pub fn format_summary(counters: &RunCounters, records: &[AgentRecord]) -> String {
    let rule = "=".repeat(WIDTH);
    let divider = "-".repeat(WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  RESULTS");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  URLs checked this run:   {:>8}", counters.checked_this_run);
    let _ = writeln!(out, "  Total URLs ever checked: {:>8}", counters.total_checked);
    let _ = writeln!(out, "  Found this run:          {:>8}", counters.found_this_run);
    let _ = writeln!(out, "  Total discovered:        {:>8}", counters.total_discovered);
    let _ = writeln!(out, "{}", divider);

    for record in records {
        let name: String = record.name.chars().take(NAME_WIDTH).collect();
        let _ = writeln!(
            out,
            "  {:<width$} {:>3} skills  {}",
            name,
            record.skills_count,
            record.protocol_version.as_deref().unwrap_or("?"),
            width = NAME_WIDTH
        );
    }

    let _ = writeln!(out, "{}", rule);
    out
}

/// Prints the summary to stdout
pub fn print_summary(counters: &RunCounters, records: &[AgentRecord]) {
    println!();
    print!("{}", format_summary(counters, records));
}
