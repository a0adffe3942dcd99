// handlers/protected/organizations/current.rs - /api/organizations/current handlers

use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::super::current_org;
use crate::auth::org_context::{CurrentOrganization, OrgContext};
use crate::auth::Permission;
use crate::database::models::{Organization, OrganizationUpdate};
use crate::error::ApiError;
use crate::middleware::cookies::org_cookie;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::authorize;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub organization_id: Uuid,
}

/// GET /api/organizations/current - The organization the request acts on
pub async fn get(Extension(context): Extension<OrgContext>) -> ApiResult<CurrentOrganization> {
    let current = current_org(&context)?;
    Ok(ApiResponse::success(current.clone()))
}

/// POST /api/organizations/current - Remember the organization to act on
///
/// Sets the organization cookie. The caller must be an active member, except
/// platform admins who may pick any existing organization.
pub async fn switch(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Json(request): Json<SwitchRequest>,
) -> ApiResult<CurrentOrganization> {
    let target = request.organization_id;

    let selected = match context.memberships.iter().find(|m| m.organization.id == target) {
        Some(entry) => CurrentOrganization::from_membership(entry),
        None if profile.is_platform_admin => {
            let organization = state
                .store
                .get_organization(target)
                .await?
                .ok_or_else(|| ApiError::not_found("Organization not found"))?;
            CurrentOrganization::platform_override(organization)
        }
        None => {
            tracing::warn!("User {} tried to switch to organization {} without membership", profile.id, target);
            return Err(ApiError::forbidden("You are not an active member of this organization"));
        }
    };

    tracing::info!("User {} switched to organization {}", profile.id, target);
    let cookie = org_cookie(&target.to_string(), &state.config.security);
    Ok(ApiResponse::success(selected).with_cookie(cookie))
}

/// PATCH /api/organizations/current - Edit name, description, logo or settings
pub async fn patch(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Json(update): Json<OrganizationUpdate>,
) -> ApiResult<Organization> {
    let current = current_org(&context)?;
    authorize(current.role, Permission::EditOrgSettings)?;

    if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::invalid_field("name", "Organization name cannot be blank"));
    }
    if update.settings.as_ref().is_some_and(|s| !s.is_object()) {
        return Err(ApiError::invalid_field("settings", "Settings must be a JSON object"));
    }

    let organization = state.store.update_organization(current.id(), &update).await?;
    tracing::info!("Updated organization {}", organization.id);
    Ok(ApiResponse::success(organization))
}
