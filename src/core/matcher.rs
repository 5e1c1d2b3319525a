use std::cmp::Ordering;
use std::collections::BTreeMap;
use crate::models::{Match, Project, ScoredVendor, ScoringWeights, Vendor};
use crate::core::{filters::is_candidate, scoring::calculate_match_score};

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Candidate selection (country membership + service intersection)
/// 2. Scoring
/// 3. Ranking (score descending, vendor id ascending)
///
/// The matcher is pure: it works on in-memory values and never touches storage.
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Vendors eligible for a project, in input order
    pub fn select_candidates<'a>(&self, project: &Project, vendors: &'a [Vendor]) -> Vec<&'a Vendor> {
        vendors
            .iter()
            .filter(|vendor| is_candidate(project, vendor))
            .collect()
    }

    /// Score and rank every eligible vendor for a project
    ///
    /// # Returns
    /// One entry per candidate, highest score first, ties by vendor id
    pub fn score_candidates(&self, project: &Project, vendors: &[Vendor]) -> Vec<ScoredVendor> {
        let mut scored: Vec<ScoredVendor> = self
            .select_candidates(project, vendors)
            .into_iter()
            .map(|vendor| {
                let (score, services_overlap) = calculate_match_score(project, vendor, &self.weights);
                ScoredVendor {
                    vendor_id: vendor.id,
                    services_overlap,
                    score,
                }
            })
            .collect();

        scored.sort_by(|a, b| rank_order(a.score, a.vendor_id, b.score, b.vendor_id));
        scored
    }

    /// Bulk precompute over all projects x vendors, as done when seeding data
    ///
    /// Produces exactly what `score_candidates` returns for each project.
    pub fn precompute(&self, projects: &[Project], vendors: &[Vendor]) -> BTreeMap<i64, Vec<ScoredVendor>> {
        projects
            .iter()
            .map(|project| (project.id, self.score_candidates(project, vendors)))
            .collect()
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Ordering used for every ranked match listing
#[inline]
pub fn rank_order(score_a: f64, vendor_a: i64, score_b: f64, vendor_b: i64) -> Ordering {
    score_b
        .partial_cmp(&score_a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| vendor_a.cmp(&vendor_b))
}

/// Sort persisted matches by score (descending), then vendor id
pub fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| rank_order(a.score, a.vendor_id, b.score, b.vendor_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectStatus, ServiceType};

    fn create_vendor(
        id: i64,
        countries: &[&str],
        services: Vec<ServiceType>,
        rating: f64,
        sla_hours: i32,
    ) -> Vendor {
        Vendor {
            id,
            name: format!("Vendor {}", id),
            countries_supported: countries.iter().map(|c| c.to_string()).collect(),
            services_offered: services,
            rating,
            response_sla_hours: sla_hours,
            sla_expires_at: None,
            sla_expired: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn create_project(id: i64, country: &str, services: Vec<ServiceType>) -> Project {
        Project {
            id,
            user_id: 1,
            country: country.to_string(),
            services_needed: services,
            budget: 25_000.0,
            status: ProjectStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_score_candidates_filters_and_ranks() {
        let matcher = Matcher::with_default_weights();
        let project = create_project(
            1,
            "Germany",
            vec![ServiceType::WebDevelopment, ServiceType::AiMl],
        );

        let vendors = vec![
            create_vendor(1, &["Germany"], vec![ServiceType::WebDevelopment], 4.0, 48), // 2 + 4 + 4
            create_vendor(2, &["Germany"], vec![ServiceType::AiMl], 4.8, 12),           // 2 + 4.8 + 76
            create_vendor(3, &["France"], vec![ServiceType::AiMl], 5.0, 1),             // Wrong country
            create_vendor(4, &["Germany"], vec![ServiceType::Blockchain], 5.0, 1),      // No overlap
        ];

        let scored = matcher.score_candidates(&project, &vendors);

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].vendor_id, 2);
        assert_eq!(scored[0].score, 82.8);
        assert_eq!(scored[1].vendor_id, 1);
        assert_eq!(scored[1].score, 10.0);
    }

    #[test]
    fn test_ties_broken_by_vendor_id() {
        let matcher = Matcher::with_default_weights();
        let project = create_project(1, "Japan", vec![ServiceType::Consulting]);

        let vendors = vec![
            create_vendor(9, &["Japan"], vec![ServiceType::Consulting], 4.0, 24),
            create_vendor(3, &["Japan"], vec![ServiceType::Consulting], 4.0, 24),
            create_vendor(5, &["Japan"], vec![ServiceType::Consulting], 4.0, 24),
        ];

        let ids: Vec<i64> = matcher
            .score_candidates(&project, &vendors)
            .iter()
            .map(|s| s.vendor_id)
            .collect();

        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn test_precompute_matches_runtime_scoring() {
        let matcher = Matcher::with_default_weights();
        let projects = vec![
            create_project(1, "Germany", vec![ServiceType::WebDevelopment]),
            create_project(2, "France", vec![ServiceType::Cybersecurity, ServiceType::AiMl]),
        ];
        let vendors = vec![
            create_vendor(1, &["Germany", "France"], vec![ServiceType::WebDevelopment, ServiceType::AiMl], 4.5, 8),
            create_vendor(2, &["France"], vec![ServiceType::Cybersecurity, ServiceType::AiMl], 3.9, 30),
        ];

        let seeded = matcher.precompute(&projects, &vendors);

        for project in &projects {
            assert_eq!(seeded[&project.id], matcher.score_candidates(project, &vendors));
        }
        assert_eq!(seeded[&1].len(), 1);
        assert_eq!(seeded[&2].len(), 2);
    }

    #[test]
    fn test_no_candidates_is_empty() {
        let matcher = Matcher::default();
        let project = create_project(1, "Brazil", vec![ServiceType::Blockchain]);
        let vendors = vec![create_vendor(1, &["Germany"], vec![ServiceType::Blockchain], 5.0, 1)];

        assert!(matcher.score_candidates(&project, &vendors).is_empty());
    }
}
