use actix_web::{web, HttpResponse};
use validator::Validate;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    CreateVendorRequest, UpdateVendorRequest, VendorListResponse, VendorResponse, VendorSearchQuery,
};
use crate::routes::AppState;
use crate::services::store::vendor_not_found;

/// Configure vendor routes
///
/// `/vendors/search` is registered ahead of `/vendors/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/vendors", web::get().to(list_vendors))
        .route("/vendors", web::post().to(create_vendor))
        .route("/vendors/search", web::get().to(search_vendors))
        .route("/vendors/{id}", web::get().to(get_vendor))
        .route("/vendors/{id}", web::patch().to(update_vendor))
        .route("/vendors/{id}", web::delete().to(delete_vendor));
}

async fn list_vendors(
    state: web::Data<AppState>,
    _user: AuthUser,
) -> Result<HttpResponse, ApiError> {
    let vendors = state.engine.store().list_vendors().await?;

    Ok(HttpResponse::Ok().json(VendorListResponse {
        message: "Vendors fetched successfully".to_string(),
        vendors,
    }))
}

async fn get_vendor(
    state: web::Data<AppState>,
    _user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let vendor = state
        .engine
        .store()
        .get_vendor(id)
        .await?
        .ok_or_else(|| vendor_not_found(id))?;

    Ok(HttpResponse::Ok().json(VendorResponse {
        message: "Vendor fetched successfully".to_string(),
        vendor,
    }))
}

/// Search vendors by country and services
///
/// GET /api/v1/vendors/search?country=Germany&services=web_development,ai_ml
///
/// Returns the vendors a project with these parameters would be matched against.
async fn search_vendors(
    state: web::Data<AppState>,
    _user: AuthUser,
    query: web::Query<VendorSearchQuery>,
) -> Result<HttpResponse, ApiError> {
    query.validate()?;
    let services = query.service_types().map_err(ApiError::BadRequest)?;

    let vendors = state.engine.search_vendors(&query.country, &services).await?;

    Ok(HttpResponse::Ok().json(VendorListResponse {
        message: "Vendors search completed successfully".to_string(),
        vendors,
    }))
}

async fn create_vendor(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateVendorRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    req.validate()?;

    tracing::info!("Creating vendor: {}", req.name);
    let vendor = state.engine.store().create_vendor(req.into_inner()).await?;
    tracing::info!("Vendor created successfully with ID: {}", vendor.id);

    Ok(HttpResponse::Created().json(VendorResponse {
        message: "Vendor created successfully".to_string(),
        vendor,
    }))
}

/// PATCH /api/v1/vendors/{id}
///
/// Existing matches keep their scores until the next rebuild.
async fn update_vendor(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    req: web::Json<UpdateVendorRequest>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    req.validate()?;
    if req.is_empty() {
        return Err(ApiError::BadRequest("At least one field must be provided".to_string()));
    }

    let vendor = state
        .engine
        .store()
        .update_vendor(path.into_inner(), req.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(VendorResponse {
        message: "Vendor updated successfully".to_string(),
        vendor,
    }))
}

async fn delete_vendor(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;

    let vendor = state.engine.store().delete_vendor(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(VendorResponse {
        message: "Vendor deleted successfully".to_string(),
        vendor,
    }))
}
