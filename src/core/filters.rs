use std::collections::HashSet;
use crate::models::{Project, ServiceType, Vendor};

/// Check if a vendor operates in the given country
///
/// Exact string membership, no normalisation.
#[inline]
pub fn supports_country(vendor: &Vendor, country: &str) -> bool {
    vendor.countries_supported.iter().any(|c| c == country)
}

/// Count the distinct needed services the vendor offers
#[inline]
pub fn services_overlap(needed: &[ServiceType], offered: &[ServiceType]) -> usize {
    needed
        .iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .filter(|service| offered.contains(service))
        .count()
}

/// Check if a vendor is eligible for matching against a project
///
/// Eligible vendors support the project's country and share at least one
/// service tag with it (intersection, not subset).
#[inline]
pub fn is_candidate(project: &Project, vendor: &Vendor) -> bool {
    supports_country(vendor, &project.country)
        && project
            .services_needed
            .iter()
            .any(|service| vendor.services_offered.contains(service))
}
