// Core algorithm exports
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use filters::{supports_country, services_overlap, is_candidate};
pub use matcher::{Matcher, rank_order, sort_matches};
pub use scoring::{calculate_match_score, sla_weight, round_score};
