//! Output module for run summaries and downstream artifacts
//!
//! This module handles:
//! - Rendering the end-of-run summary and discovery listing
//! - Rendering the registration script for discovered agents

mod registration;
mod summary;

pub use registration::{render_registration_script, write_registration_script, REGISTRATION_SKIP};
pub use summary::{format_summary, print_summary};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
