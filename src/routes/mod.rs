// Route exports
pub mod health;
pub mod matches;
pub mod projects;
pub mod vendors;

use actix_web::web;
use crate::auth::JwtVerifier;
use crate::services::MatchingEngine;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: MatchingEngine,
    pub jwt: JwtVerifier,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(projects::configure)
            .configure(vendors::configure)
            .configure(matches::configure),
    );
}
