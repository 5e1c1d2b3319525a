use async_trait::async_trait;
use thiserror::Error;
use crate::core::Matcher;
use crate::models::{
    CreateVendorRequest, Match, Project, ProjectStatus, ServiceType, UpdateProjectRequest,
    UpdateVendorRequest, User, Vendor,
};

/// Errors that can occur when interacting with the store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// A project ready to be inserted, owner already resolved
#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: i64,
    pub country: String,
    pub services_needed: Vec<ServiceType>,
    pub budget: f64,
    pub status: ProjectStatus,
}

/// Which matches to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFilter {
    All,
    Project(i64),
    Vendor(i64),
    Top(u32),
}

/// Persistence for projects, vendors and matches
///
/// `rebuild_matches` is the one compound operation: implementations must run
/// the lookup, delete and insert as a single atomic unit per project so that a
/// failed or concurrent rebuild never leaves a partial or duplicated set.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn get_project(&self, id: i64) -> Result<Option<Project>, StoreError>;
    async fn list_projects(&self, user_id: Option<i64>) -> Result<Vec<Project>, StoreError>;
    async fn create_project(&self, project: NewProject) -> Result<Project, StoreError>;
    async fn update_project(&self, id: i64, changes: UpdateProjectRequest) -> Result<Project, StoreError>;
    async fn delete_project(&self, id: i64) -> Result<Project, StoreError>;
    async fn active_project_ids(&self) -> Result<Vec<i64>, StoreError>;

    async fn get_vendor(&self, id: i64) -> Result<Option<Vendor>, StoreError>;
    async fn list_vendors(&self) -> Result<Vec<Vendor>, StoreError>;
    async fn create_vendor(&self, vendor: CreateVendorRequest) -> Result<Vendor, StoreError>;
    async fn update_vendor(&self, id: i64, changes: UpdateVendorRequest) -> Result<Vendor, StoreError>;
    async fn delete_vendor(&self, id: i64) -> Result<Vendor, StoreError>;
    /// Set `sla_expired` from `sla_expires_at`; returns how many vendors changed
    async fn flag_expired_slas(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64, StoreError>;

    async fn get_match(&self, id: i64) -> Result<Option<Match>, StoreError>;
    async fn list_matches(&self, filter: MatchFilter) -> Result<Vec<Match>, StoreError>;
    async fn delete_match(&self, id: i64) -> Result<Match, StoreError>;

    /// Replace every match of a project with a freshly scored set
    ///
    /// Fails with `NotFound` before mutating anything if the project is absent.
    /// Returns the new set, highest score first.
    async fn rebuild_matches(&self, project_id: i64, matcher: &Matcher) -> Result<Vec<Match>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Build the `NotFound` error for a missing project
pub fn project_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Project with ID {} not found", id))
}

/// Build the `NotFound` error for a project owner that is missing or not a client
pub fn client_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Client with ID {} not found", id))
}

pub fn vendor_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Vendor with ID {} not found", id))
}

pub fn match_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Match with ID {} not found", id))
}

pub fn vendor_name_taken(name: &str) -> StoreError {
    StoreError::Conflict(format!("Vendor with name '{}' already exists", name))
}
