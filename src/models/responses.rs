use serde::{Deserialize, Serialize};
use crate::models::domain::{Match, Project, Vendor};

/// Response for the rebuild endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildResponse {
    pub message: String,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub message: String,
    pub project: Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub message: String,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorResponse {
    pub message: String,
    pub vendor: Vendor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorListResponse {
    pub message: String,
    pub vendors: Vec<Vendor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchListResponse {
    pub message: String,
    pub matches: Vec<Match>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
