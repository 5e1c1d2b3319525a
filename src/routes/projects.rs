use actix_web::{web, HttpResponse};
use validator::Validate;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CreateProjectRequest, Project, ProjectListResponse, ProjectQuery, ProjectResponse,
    UpdateProjectRequest,
};
use crate::routes::AppState;
use crate::services::{
    store::{client_not_found, project_not_found},
    NewProject,
};

/// Configure project routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/projects", web::get().to(list_projects))
        .route("/projects", web::post().to(create_project))
        .route("/projects/{id}", web::get().to(get_project))
        .route("/projects/{id}", web::patch().to(update_project))
        .route("/projects/{id}", web::delete().to(delete_project))
        .route("/projects/{id}/matches/rebuild", web::post().to(rebuild_matches));
}

/// Fetch a project the caller is allowed to see
async fn load_project(state: &AppState, user: &AuthUser, id: i64) -> Result<Project, ApiError> {
    let project = state
        .engine
        .store()
        .get_project(id)
        .await?
        .ok_or_else(|| project_not_found(id))?;

    user.require_project_access(&project)?;
    Ok(project)
}

/// Rebuild matches for a project
///
/// POST /api/v1/projects/{id}/matches/rebuild
///
/// Owner or admin only. Responds with the new match set, best first.
async fn rebuild_matches(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path.into_inner();
    load_project(&state, &user, project_id).await?;

    tracing::info!("User {} rebuilding matches for project {}", user.user_id, project_id);

    let response = state.engine.rebuild_matches_for_project(project_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/projects?user_id={userId}
///
/// Clients only ever see their own projects.
async fn list_projects(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ProjectQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;

    let owner = if user.is_admin() {
        query.user_id
    } else {
        match query.user_id {
            Some(id) if id != user.user_id => {
                return Err(ApiError::Forbidden("You can only access your own projects".to_string()))
            }
            _ => Some(user.user_id),
        }
    };

    let projects = state.engine.store().list_projects(owner).await?;

    Ok(HttpResponse::Ok().json(ProjectListResponse {
        message: "Projects fetched successfully".to_string(),
        projects,
    }))
}

async fn get_project(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let project = load_project(&state, &user, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ProjectResponse {
        message: "Project fetched successfully".to_string(),
        project,
    }))
}

/// POST /api/v1/projects
///
/// Clients create projects for themselves; admins must name the owner, who
/// must be an existing client.
async fn create_project(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let req = req.into_inner();

    let owner = if user.is_admin() {
        req.user_id
            .ok_or_else(|| ApiError::BadRequest("user_id is required when an admin creates a project".to_string()))?
    } else {
        user.user_id
    };

    let store = state.engine.store();
    store
        .get_user(owner)
        .await?
        .filter(|u| !u.is_admin)
        .ok_or_else(|| client_not_found(owner))?;

    let project = store
        .create_project(NewProject {
            user_id: owner,
            country: req.country.trim().to_string(),
            services_needed: req.services_needed,
            budget: req.budget,
            status: req.status.unwrap_or_default(),
        })
        .await?;

    tracing::info!("Project {} created for user {}", project.id, project.user_id);

    Ok(HttpResponse::Created().json(ProjectResponse {
        message: "Project created successfully".to_string(),
        project,
    }))
}

/// PATCH /api/v1/projects/{id}
///
/// Does not rebuild matches; callers trigger a rebuild explicitly.
async fn update_project(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    req: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    if req.is_empty() {
        return Err(ApiError::BadRequest("At least one field must be provided".to_string()));
    }

    let project_id = path.into_inner();
    load_project(&state, &user, project_id).await?;

    let mut changes = req.into_inner();
    changes.country = changes.country.map(|c| c.trim().to_string());

    let project = state.engine.store().update_project(project_id, changes).await?;

    Ok(HttpResponse::Ok().json(ProjectResponse {
        message: "Project updated successfully".to_string(),
        project,
    }))
}

async fn delete_project(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let project_id = path.into_inner();
    load_project(&state, &user, project_id).await?;

    let project = state.engine.store().delete_project(project_id).await?;

    Ok(HttpResponse::Ok().json(ProjectResponse {
        message: "Project deleted successfully".to_string(),
        project,
    }))
}
