// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Project, ProjectStatus, Vendor, Match, ScoredVendor, ServiceType, ScoringWeights, Role, User};
pub use requests::{CreateProjectRequest, UpdateProjectRequest, CreateVendorRequest, UpdateVendorRequest, ProjectQuery, MatchQuery, VendorSearchQuery};
pub use responses::{RebuildResponse, ProjectResponse, ProjectListResponse, VendorResponse, VendorListResponse, MatchListResponse, HealthResponse, ErrorResponse};
