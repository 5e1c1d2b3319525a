use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Service categories a project can need and a vendor can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    WebDevelopment,
    MobileDevelopment,
    UiUxDesign,
    DigitalMarketing,
    DataAnalytics,
    CloudServices,
    Cybersecurity,
    AiMl,
    Blockchain,
    Consulting,
}

impl ServiceType {
    pub const ALL: [ServiceType; 10] = [
        ServiceType::WebDevelopment,
        ServiceType::MobileDevelopment,
        ServiceType::UiUxDesign,
        ServiceType::DigitalMarketing,
        ServiceType::DataAnalytics,
        ServiceType::CloudServices,
        ServiceType::Cybersecurity,
        ServiceType::AiMl,
        ServiceType::Blockchain,
        ServiceType::Consulting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::WebDevelopment => "web_development",
            ServiceType::MobileDevelopment => "mobile_development",
            ServiceType::UiUxDesign => "ui_ux_design",
            ServiceType::DigitalMarketing => "digital_marketing",
            ServiceType::DataAnalytics => "data_analytics",
            ServiceType::CloudServices => "cloud_services",
            ServiceType::Cybersecurity => "cybersecurity",
            ServiceType::AiMl => "ai_ml",
            ServiceType::Blockchain => "blockchain",
            ServiceType::Consulting => "consulting",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ServiceType::ALL
            .iter()
            .copied()
            .find(|service| service.as_str() == needle)
            .ok_or_else(|| format!("unknown service type '{}'", s))
    }
}

/// Lifecycle state of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
    Expansion,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Expansion => "expansion",
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ProjectStatus::Draft),
            "active" => Ok(ProjectStatus::Active),
            "paused" => Ok(ProjectStatus::Paused),
            "completed" => Ok(ProjectStatus::Completed),
            "expansion" => Ok(ProjectStatus::Expansion),
            other => Err(format!("unknown project status '{}'", other)),
        }
    }
}

/// A client's expansion request for services in a target country
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub country: String,
    pub services_needed: Vec<ServiceType>,
    pub budget: f64,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A service provider with supported countries, offered services, rating, and SLA
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub countries_supported: Vec<String>,
    pub services_offered: Vec<ServiceType>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default = "default_sla_hours")]
    pub response_sla_hours: i32,
    #[serde(default)]
    pub sla_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub sla_expired: bool,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub fn default_sla_hours() -> i32 { 24 }

/// Whether `value` has at most two decimal places
pub fn has_two_decimal_places(value: f64) -> bool {
    let cents = value * 100.0;
    value.is_finite() && (cents - cents.round()).abs() < 1e-6
}

impl Vendor {
    /// Whether the vendor's SLA lapsed at `now`
    pub fn sla_lapsed_at(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.sla_expires_at.map(|at| at < now).unwrap_or(false)
    }
}

/// A persisted, scored pairing between one project and one vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub project_id: i64,
    pub vendor_id: i64,
    pub score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Score computed for a candidate vendor, before it is persisted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredVendor {
    pub vendor_id: i64,
    pub services_overlap: usize,
    pub score: f64,
}

/// Scoring weights
///
/// score = clamp(services_overlap * service_overlap + rating
///               + max(0, sla_base - response_sla_hours * sla_hour_penalty), 0, 100)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub service_overlap: f64,
    pub sla_base: f64,
    pub sla_hour_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            service_overlap: 2.0,
            sla_base: 100.0,
            sla_hour_penalty: 2.0,
        }
    }
}

/// Caller role carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Client,
}

/// An account that can own projects
///
/// Only clients own projects; admins manage vendors and other users' data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub company_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn role(&self) -> Role {
        if self.is_admin {
            Role::Admin
        } else {
            Role::Client
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_parse() {
        assert_eq!("ai_ml".parse::<ServiceType>().unwrap(), ServiceType::AiMl);
        assert_eq!(" Consulting ".parse::<ServiceType>().unwrap(), ServiceType::Consulting);
        assert!("astrology".parse::<ServiceType>().is_err());
    }

    #[test]
    fn test_service_type_serde_names() {
        let json = serde_json::to_string(&ServiceType::UiUxDesign).unwrap();
        assert_eq!(json, "\"ui_ux_design\"");
    }

    #[test]
    fn test_project_status_default_is_draft() {
        assert_eq!(ProjectStatus::default(), ProjectStatus::Draft);
        assert_eq!("ACTIVE".parse::<ProjectStatus>().unwrap(), ProjectStatus::Active);
    }

    #[test]
    fn test_two_decimal_places() {
        assert!(has_two_decimal_places(4.8));
        assert!(has_two_decimal_places(4.55));
        assert!(has_two_decimal_places(0.0));
        assert!(!has_two_decimal_places(4.555));
        assert!(!has_two_decimal_places(0.135));
        assert!(!has_two_decimal_places(f64::NAN));
    }

    #[test]
    fn test_user_role() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": 3,
            "company_name": "Acme",
            "contact_email": "ops@acme.test"
        }))
        .unwrap();

        assert_eq!(user.role(), Role::Client);
    }

    #[test]
    fn test_vendor_sla_lapsed() {
        let now = chrono::Utc::now();
        let mut vendor: Vendor = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Acme",
            "countries_supported": ["Germany"],
            "services_offered": ["consulting"]
        }))
        .unwrap();

        assert_eq!(vendor.response_sla_hours, 24);
        assert!(!vendor.sla_lapsed_at(now));

        vendor.sla_expires_at = Some(now - chrono::Duration::hours(1));
        assert!(vendor.sla_lapsed_at(now));
    }
}
