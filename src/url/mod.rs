//! URL handling module for Agent Scout
//!
//! This module provides candidate URL normalization, well-known path
//! composition, and the hint-domain checks used by domain-mining sources.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{domain_base_url, is_plausible_domain};
pub use normalize::{normalize_candidate, well_known_url};
