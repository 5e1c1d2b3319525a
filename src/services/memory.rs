use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use crate::core::{sort_matches, Matcher};
use crate::models::domain::has_two_decimal_places;
use crate::models::{
    CreateVendorRequest, Match, Project, ProjectStatus, UpdateProjectRequest, UpdateVendorRequest,
    User, Vendor,
};
use crate::services::store::{
    client_not_found, match_not_found, project_not_found, vendor_name_taken, vendor_not_found,
    MatchFilter, MatchStore, NewProject, StoreError,
};

/// Users, projects and vendors loaded from a JSON seed file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub vendors: Vec<Vendor>,
}

impl SeedData {
    /// Apply the same vendor rules the API enforces on writes
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut names = std::collections::HashSet::new();

        for vendor in &self.vendors {
            let invalid = |reason: &str| {
                StoreError::InvalidData(format!("seed vendor {} ({}): {}", vendor.id, vendor.name, reason))
            };

            if !names.insert(vendor.name.as_str()) {
                return Err(vendor_name_taken(&vendor.name));
            }
            if !(0.0..=5.0).contains(&vendor.rating) || !has_two_decimal_places(vendor.rating) {
                return Err(invalid("rating must be between 0 and 5 with at most 2 decimal places"));
            }
            if !(1..=168).contains(&vendor.response_sla_hours) {
                return Err(invalid("response SLA must be between 1 and 168 hours"));
            }
            if vendor.countries_supported.is_empty() || vendor.countries_supported.len() > 50 {
                return Err(invalid("must support between 1 and 50 countries"));
            }
            if vendor.services_offered.is_empty() || vendor.services_offered.len() > 20 {
                return Err(invalid("must offer between 1 and 20 services"));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    projects: BTreeMap<i64, Project>,
    vendors: BTreeMap<i64, Vendor>,
    matches: BTreeMap<i64, Match>,
    last_project_id: i64,
    last_vendor_id: i64,
    last_match_id: i64,
}

impl MemoryState {
    fn push_match(&mut self, project_id: i64, vendor_id: i64, score: f64, now: chrono::DateTime<chrono::Utc>) -> Match {
        self.last_match_id += 1;
        let record = Match {
            id: self.last_match_id,
            project_id,
            vendor_id,
            score,
            created_at: now,
        };
        self.matches.insert(record.id, record.clone());
        record
    }
}

/// In-process store used when no database is configured, and by tests
///
/// All state sits behind one lock; a rebuild scores the new set and swaps it
/// in while holding the write guard, so readers never observe a half-built set.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from seed data, precomputing every project's matches
    pub fn seeded(seed: SeedData, matcher: &Matcher) -> Self {
        let mut state = MemoryState::default();
        let now = chrono::Utc::now();

        let precomputed = matcher.precompute(&seed.projects, &seed.vendors);

        for user in seed.users {
            state.users.insert(user.id, user);
        }
        for mut project in seed.projects {
            project.created_at.get_or_insert(now);
            project.updated_at.get_or_insert(now);
            state.last_project_id = state.last_project_id.max(project.id);
            state.projects.insert(project.id, project);
        }
        for mut vendor in seed.vendors {
            vendor.created_at.get_or_insert(now);
            vendor.updated_at.get_or_insert(now);
            state.last_vendor_id = state.last_vendor_id.max(vendor.id);
            state.vendors.insert(vendor.id, vendor);
        }
        for (project_id, scored) in precomputed {
            for candidate in scored {
                state.push_match(project_id, candidate.vendor_id, candidate.score, now);
            }
        }

        tracing::info!(
            "Seeded in-memory store: {} projects, {} vendors, {} matches",
            state.projects.len(),
            state.vendors.len(),
            state.matches.len()
        );

        Self {
            state: RwLock::new(state),
        }
    }

    /// Load seed data from a JSON file
    ///
    /// Vendors that break the rating, SLA or list-size rules reject the whole file.
    pub fn from_seed_file<P: AsRef<Path>>(path: P, matcher: &Matcher) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::InvalidData(format!("cannot read {}: {}", path.display(), e)))?;
        let seed: SeedData = serde_json::from_str(&raw)
            .map_err(|e| StoreError::InvalidData(format!("invalid seed file {}: {}", path.display(), e)))?;
        seed.validate()?;

        Ok(Self::seeded(seed, matcher))
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_project(&self, id: i64) -> Result<Option<Project>, StoreError> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self, user_id: Option<i64>) -> Result<Vec<Project>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .values()
            .filter(|p| user_id.map_or(true, |uid| p.user_id == uid))
            .cloned()
            .collect())
    }

    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&project.user_id) {
            return Err(client_not_found(project.user_id));
        }

        let now = chrono::Utc::now();
        state.last_project_id += 1;

        let record = Project {
            id: state.last_project_id,
            user_id: project.user_id,
            country: project.country,
            services_needed: project.services_needed,
            budget: project.budget,
            status: project.status,
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.projects.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_project(&self, id: i64, changes: UpdateProjectRequest) -> Result<Project, StoreError> {
        let mut state = self.state.write().await;
        let project = state.projects.get_mut(&id).ok_or_else(|| project_not_found(id))?;

        if let Some(country) = changes.country {
            project.country = country;
        }
        if let Some(services) = changes.services_needed {
            project.services_needed = services;
        }
        if let Some(budget) = changes.budget {
            project.budget = budget;
        }
        if let Some(status) = changes.status {
            project.status = status;
        }
        project.updated_at = Some(chrono::Utc::now());

        Ok(project.clone())
    }

    async fn delete_project(&self, id: i64) -> Result<Project, StoreError> {
        let mut state = self.state.write().await;
        let project = state.projects.remove(&id).ok_or_else(|| project_not_found(id))?;
        state.matches.retain(|_, m| m.project_id != id);
        Ok(project)
    }

    async fn active_project_ids(&self) -> Result<Vec<i64>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .projects
            .values()
            .filter(|p| p.status == ProjectStatus::Active)
            .map(|p| p.id)
            .collect())
    }

    async fn get_vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError> {
        Ok(self.state.read().await.vendors.get(&id).cloned())
    }

    async fn list_vendors(&self) -> Result<Vec<Vendor>, StoreError> {
        Ok(self.state.read().await.vendors.values().cloned().collect())
    }

    async fn create_vendor(&self, vendor: CreateVendorRequest) -> Result<Vendor, StoreError> {
        let mut state = self.state.write().await;
        if state.vendors.values().any(|v| v.name == vendor.name) {
            return Err(vendor_name_taken(&vendor.name));
        }

        let now = chrono::Utc::now();
        state.last_vendor_id += 1;

        let record = Vendor {
            id: state.last_vendor_id,
            name: vendor.name,
            countries_supported: vendor.countries_supported,
            services_offered: vendor.services_offered,
            rating: vendor.rating.unwrap_or(0.0),
            response_sla_hours: vendor.response_sla_hours.unwrap_or_else(crate::models::domain::default_sla_hours),
            sla_expired: vendor.sla_expires_at.map(|at| at < now).unwrap_or(false),
            sla_expires_at: vendor.sla_expires_at,
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.vendors.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_vendor(&self, id: i64, changes: UpdateVendorRequest) -> Result<Vendor, StoreError> {
        let mut state = self.state.write().await;

        if !state.vendors.contains_key(&id) {
            return Err(vendor_not_found(id));
        }
        if let Some(name) = &changes.name {
            if state.vendors.values().any(|v| v.id != id && &v.name == name) {
                return Err(vendor_name_taken(name));
            }
        }

        let vendor = state.vendors.get_mut(&id).ok_or_else(|| vendor_not_found(id))?;

        if let Some(name) = changes.name {
            vendor.name = name;
        }
        if let Some(countries) = changes.countries_supported {
            vendor.countries_supported = countries;
        }
        if let Some(services) = changes.services_offered {
            vendor.services_offered = services;
        }
        if let Some(rating) = changes.rating {
            vendor.rating = rating;
        }
        if let Some(hours) = changes.response_sla_hours {
            vendor.response_sla_hours = hours;
        }
        if let Some(expires_at) = changes.sla_expires_at {
            vendor.sla_expires_at = Some(expires_at);
        }
        vendor.updated_at = Some(chrono::Utc::now());

        Ok(vendor.clone())
    }

    async fn delete_vendor(&self, id: i64) -> Result<Vendor, StoreError> {
        let mut state = self.state.write().await;
        let vendor = state.vendors.remove(&id).ok_or_else(|| vendor_not_found(id))?;
        state.matches.retain(|_, m| m.vendor_id != id);
        Ok(vendor)
    }

    async fn flag_expired_slas(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let mut updated = 0;

        for vendor in state.vendors.values_mut() {
            let expired = vendor.sla_lapsed_at(now);
            if vendor.sla_expired != expired {
                vendor.sla_expired = expired;
                vendor.updated_at = Some(now);
                updated += 1;
            }
        }

        Ok(updated)
    }

    async fn get_match(&self, id: i64) -> Result<Option<Match>, StoreError> {
        Ok(self.state.read().await.matches.get(&id).cloned())
    }

    async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<Match>, StoreError> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| match filter {
                MatchFilter::Project(project_id) => m.project_id == project_id,
                MatchFilter::Vendor(vendor_id) => m.vendor_id == vendor_id,
                MatchFilter::All | MatchFilter::Top(_) => true,
            })
            .cloned()
            .collect();

        sort_matches(&mut matches);
        if let MatchFilter::Top(limit) = filter {
            matches.truncate(limit as usize);
        }
        Ok(matches)
    }

    async fn delete_match(&self, id: i64) -> Result<Match, StoreError> {
        let mut state = self.state.write().await;
        state.matches.remove(&id).ok_or_else(|| match_not_found(id))
    }

    async fn rebuild_matches(&self, project_id: i64, matcher: &Matcher) -> Result<Vec<Match>, StoreError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let project = state
            .projects
            .get(&project_id)
            .ok_or_else(|| project_not_found(project_id))?;

        let vendors: Vec<Vendor> = state.vendors.values().cloned().collect();
        let scored = matcher.score_candidates(project, &vendors);

        state.matches.retain(|_, m| m.project_id != project_id);

        let now = chrono::Utc::now();
        Ok(scored
            .into_iter()
            .map(|candidate| state.push_match(project_id, candidate.vendor_id, candidate.score, now))
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
