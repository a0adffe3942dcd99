// handlers/protected/auth/context.rs - GET /api/auth/context handler

use axum::Extension;
use serde::Serialize;

use crate::auth::org_context::OrgContext;
use crate::auth::Role;
use crate::database::models::{MembershipWithOrganization, Organization, OrganizationMember, Profile};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

#[derive(Debug, Serialize)]
pub struct SessionContext {
    pub profile: Profile,
    pub organization: Option<Organization>,
    pub membership: Option<OrganizationMember>,
    pub role: Option<Role>,
    pub role_name: Option<&'static str>,
    pub is_platform_admin: bool,
    pub my_organizations: Vec<MembershipWithOrganization>,
}

/// GET /api/auth/context - Who the caller is and which organization they act on
pub async fn get(
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
) -> ApiResult<SessionContext> {
    let role = context.role();
    let (organization, membership) = match context.current {
        Some(current) => (Some(current.organization), current.membership),
        None => (None, None),
    };

    Ok(ApiResponse::success(SessionContext {
        is_platform_admin: profile.is_platform_admin,
        profile,
        organization,
        membership,
        role,
        role_name: role.map(|r| r.display_name()),
        my_organizations: context.memberships,
    }))
}
