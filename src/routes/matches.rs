use actix_web::{web, HttpResponse};
use validator::Validate;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{MatchListResponse, MatchQuery};
use crate::routes::AppState;
use crate::services::{
    store::{match_not_found, project_not_found},
    MatchFilter,
};

/// Configure all match-related routes
///
/// Matches are read-only here apart from admin deletes; they are only ever
/// created by a rebuild.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/matches", web::get().to(list_matches))
        .route("/matches/{id}", web::get().to(get_match))
        .route("/matches/{id}", web::delete().to(delete_match));
}

/// List matches
///
/// GET /api/v1/matches?project_id={id} | ?vendor_id={id} | ?top={n}
///
/// Clients must filter by one of their own projects; the other filters are admin only.
async fn list_matches(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<MatchQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;

    let filter = match (query.project_id, query.vendor_id, query.top) {
        (Some(project_id), _, _) => MatchFilter::Project(project_id),
        (None, Some(vendor_id), _) => MatchFilter::Vendor(vendor_id),
        (None, None, Some(top)) => MatchFilter::Top(top),
        (None, None, None) => MatchFilter::All,
    };

    match filter {
        MatchFilter::Project(project_id) => {
            let project = state
                .engine
                .store()
                .get_project(project_id)
                .await?
                .ok_or_else(|| project_not_found(project_id))?;
            user.require_project_access(&project)?;
        }
        _ => user.require_admin()?,
    }

    let matches = state.engine.store().list_matches(filter).await?;

    tracing::debug!("Returning {} matches for {:?}", matches.len(), filter);

    Ok(HttpResponse::Ok().json(MatchListResponse {
        message: "Matches fetched successfully".to_string(),
        matches,
    }))
}

async fn get_match(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let store = state.engine.store();

    let found = store.get_match(id).await?.ok_or_else(|| match_not_found(id))?;

    if !user.is_admin() {
        let project = store
            .get_project(found.project_id)
            .await?
            .ok_or_else(|| project_not_found(found.project_id))?;
        user.require_project_access(&project)?;
    }

    Ok(HttpResponse::Ok().json(found))
}

async fn delete_match(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let removed = state.engine.store().delete_match(path.into_inner()).await?;
    tracing::info!("Match {} deleted by user {}", removed.id, user.user_id);

    Ok(HttpResponse::Ok().json(removed))
}
