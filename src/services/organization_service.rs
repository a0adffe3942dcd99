use std::sync::Arc;

use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::auth::org_context::CurrentOrganization;
use crate::database::models::NewOrganization;
use crate::database::{PortalStore, StoreError};

const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 63;

pub struct OrganizationService {
    store: Arc<dyn PortalStore>,
}

impl OrganizationService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    /// Create an organization owned by `creator`. Any active user may create
    /// one; the result is ready to become the caller's current organization.
    pub async fn create(&self, creator: Uuid, organization: &NewOrganization) -> ServiceResult<CurrentOrganization> {
        if organization.name.trim().is_empty() {
            return Err(ServiceError::invalid("Organization name is required"));
        }
        if !valid_slug(&organization.slug) {
            return Err(ServiceError::invalid(
                "Slug must be 3 to 63 lowercase letters, digits or inner hyphens",
            ));
        }
        if !organization.settings.is_object() {
            return Err(ServiceError::invalid("Settings must be a JSON object"));
        }

        let created = match self.store.create_organization(organization, creator).await {
            Err(StoreError::Conflict(_)) => {
                return Err(ServiceError::conflict("Organization slug is already taken"))
            }
            other => other?,
        };

        tracing::info!("User {} created organization {} ({})", creator, created.organization.id, created.organization.slug);
        Ok(CurrentOrganization::from_membership(&created))
    }
}

/// Lowercase ASCII letters, digits and hyphens, with no leading or trailing
/// hyphen
pub fn valid_slug(slug: &str) -> bool {
    (SLUG_MIN..=SLUG_MAX).contains(&slug.len())
        && slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
}
