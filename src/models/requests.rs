use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::models::domain::{has_two_decimal_places, ProjectStatus, ServiceType};

/// Ratings are kept to two decimal places
fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    if !has_two_decimal_places(rating) {
        let mut err = ValidationError::new("rating_precision");
        err.message = Some("Rating must be a number with max 2 decimal places".into());
        return Err(err);
    }
    Ok(())
}

/// Request to create a project
///
/// `user_id` is only honoured for admins; clients always create projects for themselves.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(range(min = 1))]
    pub user_id: Option<i64>,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1))]
    pub services_needed: Vec<ServiceType>,
    #[validate(range(min = 0.0))]
    pub budget: f64,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

/// Partial project update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub country: Option<String>,
    #[validate(length(min = 1))]
    pub services_needed: Option<Vec<ServiceType>>,
    #[validate(range(min = 0.0))]
    pub budget: Option<f64>,
    pub status: Option<ProjectStatus>,
}

impl UpdateProjectRequest {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.services_needed.is_none()
            && self.budget.is_none()
            && self.status.is_none()
    }
}

/// Request to register a vendor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateVendorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub countries_supported: Vec<String>,
    #[validate(length(min = 1, max = 20))]
    pub services_offered: Vec<ServiceType>,
    #[validate(range(min = 0.0, max = 5.0), custom(function = "validate_rating"))]
    pub rating: Option<f64>,
    #[validate(range(min = 1, max = 168))]
    pub response_sla_hours: Option<i32>,
    #[serde(default)]
    pub sla_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Partial vendor update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateVendorRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub countries_supported: Option<Vec<String>>,
    #[validate(length(min = 1, max = 20))]
    pub services_offered: Option<Vec<ServiceType>>,
    #[validate(range(min = 0.0, max = 5.0), custom(function = "validate_rating"))]
    pub rating: Option<f64>,
    #[validate(range(min = 1, max = 168))]
    pub response_sla_hours: Option<i32>,
    pub sla_expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl UpdateVendorRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.countries_supported.is_none()
            && self.services_offered.is_none()
            && self.rating.is_none()
            && self.response_sla_hours.is_none()
            && self.sla_expires_at.is_none()
    }
}

/// Query string for `GET /projects`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProjectQuery {
    #[validate(range(min = 1))]
    pub user_id: Option<i64>,
}

/// Query string for `GET /matches`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MatchQuery {
    pub project_id: Option<i64>,
    pub vendor_id: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub top: Option<u32>,
}

/// Query string for `GET /vendors/search`
///
/// `services` is a comma separated list, e.g. `web_development,consulting`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VendorSearchQuery {
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1))]
    pub services: String,
}

impl VendorSearchQuery {
    pub fn service_types(&self) -> Result<Vec<ServiceType>, String> {
        let services = self
            .services
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<ServiceType>, String>>()?;

        if services.is_empty() {
            return Err("At least one service must be specified".to_string());
        }
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_search_parses_services() {
        let query = VendorSearchQuery {
            country: "Germany".to_string(),
            services: "web_development, consulting".to_string(),
        };
        assert_eq!(
            query.service_types().unwrap(),
            vec![ServiceType::WebDevelopment, ServiceType::Consulting]
        );
    }

    #[test]
    fn test_vendor_search_rejects_unknown_service() {
        let query = VendorSearchQuery {
            country: "Germany".to_string(),
            services: "web_development,astrology".to_string(),
        };
        assert!(query.service_types().is_err());
    }

    #[test]
    fn test_create_vendor_rating_range() {
        let req = CreateVendorRequest {
            name: "Acme".to_string(),
            countries_supported: vec!["Germany".to_string()],
            services_offered: vec![ServiceType::Consulting],
            rating: Some(5.5),
            response_sla_hours: Some(12),
            sla_expires_at: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_vendor_rating_limited_to_two_decimals() {
        let mut req = CreateVendorRequest {
            name: "Acme".to_string(),
            countries_supported: vec!["Germany".to_string()],
            services_offered: vec![ServiceType::Consulting],
            rating: Some(1.005),
            response_sla_hours: None,
            sla_expires_at: None,
        };
        assert!(req.validate().is_err());

        req.rating = Some(4.55);
        assert!(req.validate().is_ok());

        let update = UpdateVendorRequest {
            rating: Some(0.135),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_vendor_list_limits() {
        let req = CreateVendorRequest {
            name: "Acme".to_string(),
            countries_supported: (0..51).map(|i| format!("Country {}", i)).collect(),
            services_offered: vec![ServiceType::Consulting],
            rating: None,
            response_sla_hours: None,
            sla_expires_at: None,
        };
        assert!(req.validate().is_err());

        let update = UpdateVendorRequest {
            services_offered: Some(vec![ServiceType::Consulting; 21]),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_create_project_requires_services() {
        let req = CreateProjectRequest {
            user_id: None,
            country: "France".to_string(),
            services_needed: vec![],
            budget: 1000.0,
            status: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_update_detected() {
        assert!(UpdateProjectRequest::default().is_empty());
        assert!(UpdateVendorRequest::default().is_empty());
    }
}
