//! Vendor Match - matches client expansion projects to service vendors
//!
//! The core of this crate is a pure scoring engine: given a project's country
//! and needed services it selects eligible vendors and scores each one from
//! 0 to 100. Rebuilds replace a project's whole match set atomically.

pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Matcher, calculate_match_score};
pub use models::{Project, Vendor, Match, ServiceType, ProjectStatus, ScoringWeights, ScoredVendor};
pub use services::{MatchingEngine, MatchStore, MemoryStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matcher = Matcher::default();
        assert_eq!(matcher.weights(), &ScoringWeights::default());
    }
}
