// handlers/protected/members/manage.rs - /api/members/:id management handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::auth::Role;
use crate::database::models::OrganizationMember;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

/// PATCH /api/members/:id/role - Change a member's role
pub async fn role_patch(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Path(member_id): Path<Uuid>,
    Json(change): Json<RoleChange>,
) -> ApiResult<OrganizationMember> {
    let current = current_org(&context)?;
    let member = state.members().change_role(current, profile.id, member_id, change.role).await?;
    Ok(ApiResponse::success(member))
}

/// DELETE /api/members/:id - Remove a member from the organization
pub async fn delete(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<()> {
    let current = current_org(&context)?;
    state.members().remove(current, profile.id, member_id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/members/:id/suspend - Suspend a member
pub async fn suspend(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<OrganizationMember> {
    let current = current_org(&context)?;
    let member = state.members().suspend(current, profile.id, member_id).await?;
    Ok(ApiResponse::success(member))
}

/// POST /api/members/:id/reactivate - Lift a suspension
pub async fn reactivate(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<OrganizationMember> {
    let current = current_org(&context)?;
    let member = state.members().reactivate(current, profile.id, member_id).await?;
    Ok(ApiResponse::success(member))
}

/// POST /api/members/:id/resend-invitation - Email a fresh sign-in link
pub async fn resend_invitation(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Path(member_id): Path<Uuid>,
) -> ApiResult<()> {
    let current = current_org(&context)?;
    state.members().resend_invitation(current, profile.id, member_id).await?;
    Ok(ApiResponse::no_content())
}
