// handlers/protected/organizations/list.rs - GET /api/organizations handler

use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::org_context::OrgContext;
use crate::auth::Role;
use crate::database::models::Organization;
use crate::middleware::{ApiResponse, ApiResult};

/// One entry of the organization switcher
#[derive(Debug, Serialize)]
pub struct OrganizationEntry {
    pub organization: Organization,
    pub role: Role,
    pub membership_id: Uuid,
    pub is_current: bool,
}

/// GET /api/organizations - Organizations the caller is an active member of
pub async fn get(Extension(context): Extension<OrgContext>) -> ApiResult<Vec<OrganizationEntry>> {
    let current_id = context.current.as_ref().map(|c| c.id());

    let entries = context
        .memberships
        .into_iter()
        .map(|entry| OrganizationEntry {
            is_current: Some(entry.organization.id) == current_id,
            role: entry.membership.role,
            membership_id: entry.membership.id,
            organization: entry.organization,
        })
        .collect();

    Ok(ApiResponse::success(entries))
}
