//! Current-organization resolution.
//!
//! A user may belong to several organizations. The one a request acts on is
//! chosen by [`resolve`]: the requested organization when the user is an
//! active member of it, otherwise the earliest active membership.

use serde::Serialize;
use uuid::Uuid;

use super::permissions::Role;
use crate::database::models::{MembershipWithOrganization, Organization, OrganizationMember};

/// Header that selects the organization for API clients
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// The organization a request acts on, with the caller's effective role
#[derive(Debug, Clone, Serialize)]
pub struct CurrentOrganization {
    pub organization: Organization,
    /// `None` when a platform admin acts on an organization they do not belong to
    pub membership: Option<OrganizationMember>,
    pub role: Role,
}

impl CurrentOrganization {
    pub fn id(&self) -> Uuid {
        self.organization.id
    }

    pub fn from_membership(entry: &MembershipWithOrganization) -> Self {
        Self {
            organization: entry.organization.clone(),
            membership: Some(entry.membership.clone()),
            role: entry.membership.role,
        }
    }

    /// Platform staff acting on an organization without a membership
    pub fn platform_override(organization: Organization) -> Self {
        Self { organization, membership: None, role: Role::Owner }
    }
}

/// Per-request organization context, inserted by the org-context middleware
#[derive(Debug, Clone, Serialize)]
pub struct OrgContext {
    pub memberships: Vec<MembershipWithOrganization>,
    pub current: Option<CurrentOrganization>,
}

impl OrgContext {
    pub fn role(&self) -> Option<Role> {
        self.current.as_ref().map(|c| c.role)
    }
}

/// Pick the membership a request should act on.
///
/// Only active memberships are candidates. A requested id that is not among
/// them falls back to the earliest joined one (ties broken by id).
pub fn resolve(
    memberships: &[MembershipWithOrganization],
    requested: Option<Uuid>,
) -> Option<&MembershipWithOrganization> {
    let active = memberships.iter().filter(|m| m.membership.is_active());

    if let Some(requested) = requested {
        if let Some(found) = active.clone().find(|m| m.organization.id == requested) {
            return Some(found);
        }
    }

    active.min_by_key(|m| (m.membership.joined_at, m.membership.id))
}

/// Parse an organization id from a header or cookie value; junk is ignored
pub fn parse_requested(value: Option<&str>) -> Option<Uuid> {
    value.and_then(|v| Uuid::parse_str(v.trim()).ok())
}
