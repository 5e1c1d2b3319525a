use crate::models::{Project, ScoringWeights, Vendor};
use crate::core::filters::services_overlap;

/// Upper bound of a match score
pub const MAX_SCORE: f64 = 100.0;

/// Calculate a match score (0-100) for a vendor against a project
///
/// Scoring formula:
/// raw = services_overlap * 2      # shared service tags
///     + rating                    # 0.00 - 5.00
///     + max(0, 100 - sla_hours * 2)
/// score = round2(clamp(raw, 0, 100))
///
/// Returns the score together with the overlap count. This is the only
/// scoring rule: runtime rebuilds and seed-time precomputation both go
/// through it.
pub fn calculate_match_score(
    project: &Project,
    vendor: &Vendor,
    weights: &ScoringWeights,
) -> (f64, usize) {
    let overlap = services_overlap(&project.services_needed, &vendor.services_offered);

    let raw_score = overlap as f64 * weights.service_overlap
        + vendor.rating
        + sla_weight(vendor.response_sla_hours, weights);

    (round_score(raw_score.clamp(0.0, MAX_SCORE)), overlap)
}

/// Weight for the vendor's response SLA
/// Faster responses score higher; anything at or above 50h scores 0 with default weights
#[inline]
pub fn sla_weight(response_sla_hours: i32, weights: &ScoringWeights) -> f64 {
    (weights.sla_base - response_sla_hours as f64 * weights.sla_hour_penalty).max(0.0)
}

/// Round to two decimal places, half away from zero
#[inline]
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
