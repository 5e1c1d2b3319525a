use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use crate::core::Matcher;
use crate::models::{RebuildResponse, Vendor};
use crate::services::store::{MatchStore, StoreError};

/// A project whose scheduled refresh failed
#[derive(Debug, Clone, Serialize)]
pub struct RefreshFailure {
    pub project_id: i64,
    pub error: String,
}

/// Outcome of refreshing every active project
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run_id: Uuid,
    pub processed: usize,
    pub succeeded: usize,
    pub matches_written: usize,
    pub failures: Vec<RefreshFailure>,
}

/// Runs match rebuilds against a store
///
/// Cloning is cheap; the store is shared.
#[derive(Clone)]
pub struct MatchingEngine {
    store: Arc<dyn MatchStore>,
    matcher: Matcher,
}

impl MatchingEngine {
    pub fn new(store: Arc<dyn MatchStore>, matcher: Matcher) -> Self {
        Self { store, matcher }
    }

    pub fn store(&self) -> &Arc<dyn MatchStore> {
        &self.store
    }

    /// Replace a project's matches with a freshly scored set
    ///
    /// Fails with `StoreError::NotFound` when the project does not exist. An
    /// empty candidate set is not an error.
    pub async fn rebuild_matches_for_project(&self, project_id: i64) -> Result<RebuildResponse, StoreError> {
        let matches = self.store.rebuild_matches(project_id, &self.matcher).await?;

        tracing::info!(
            "Rebuilt {} matches for project {}",
            matches.len(),
            project_id
        );

        Ok(RebuildResponse {
            message: format!("Matches rebuilt successfully for project {}", project_id),
            matches,
        })
    }

    /// Rebuild matches for every active project, one after another
    ///
    /// A failing project is logged and recorded; the remaining projects still
    /// run. Failures are not retried.
    pub async fn refresh_active_projects(&self) -> Result<RefreshReport, StoreError> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, "Starting match refresh for active projects");

        let project_ids = self.store.active_project_ids().await?;

        let mut report = RefreshReport {
            run_id,
            processed: project_ids.len(),
            succeeded: 0,
            matches_written: 0,
            failures: Vec::new(),
        };

        for project_id in project_ids {
            match self.store.rebuild_matches(project_id, &self.matcher).await {
                Ok(matches) => {
                    report.succeeded += 1;
                    report.matches_written += matches.len();
                }
                Err(e) => {
                    tracing::error!(%run_id, "Failed to refresh matches for project {}: {}", project_id, e);
                    report.failures.push(RefreshFailure {
                        project_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            %run_id,
            "Completed match refresh for {} projects ({} failed, {} matches written)",
            report.processed,
            report.failures.len(),
            report.matches_written
        );

        Ok(report)
    }

    /// Vendors that would be candidates for a project in `country` needing `services`
    pub async fn search_vendors(
        &self,
        country: &str,
        services: &[crate::models::ServiceType],
    ) -> Result<Vec<Vendor>, StoreError> {
        let country = country.trim();
        if country.is_empty() {
            return Err(StoreError::InvalidData("Country parameter is required".to_string()));
        }
        if services.is_empty() {
            return Err(StoreError::InvalidData("At least one service must be specified".to_string()));
        }

        let vendors = self.store.list_vendors().await?;
        let probe = crate::models::Project {
            id: 0,
            user_id: 0,
            country: country.to_string(),
            services_needed: services.to_vec(),
            budget: 0.0,
            status: Default::default(),
            created_at: None,
            updated_at: None,
        };

        let found: Vec<Vendor> = self
            .matcher
            .select_candidates(&probe, &vendors)
            .into_iter()
            .cloned()
            .collect();

        tracing::debug!("Found {} vendors for {} / {:?}", found.len(), country, services);
        Ok(found)
    }

    /// Flag vendors whose SLA has lapsed
    pub async fn flag_expired_slas(&self) -> Result<u64, StoreError> {
        tracing::info!("Starting SLA expiry check for vendors");
        let updated = self.store.flag_expired_slas(chrono::Utc::now()).await?;
        tracing::info!("Completed SLA expiry check. Vendors updated: {}", updated);
        Ok(updated)
    }
}
