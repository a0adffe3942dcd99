// handlers/protected/mod.rs - Protected handlers (access token required)
//
// Route Prefix: /api/*
// Middleware: jwt_auth → validate_user → org_context
//
// Handlers receive `ValidatedUser` (the caller's active profile) and
// `OrgContext` (memberships plus the organization the request acts on)
// as request extensions.
pub mod auth;
pub mod chat;
pub mod crm;
pub mod enrollments;
pub mod gamification;
pub mod journeys;
pub mod members;
pub mod navigation;
pub mod organizations;
pub mod profile;
pub mod superset;

use crate::auth::org_context::{CurrentOrganization, OrgContext};
use crate::auth::{has_permission, Role};
use crate::error::ApiError;

/// Organization the request acts on; organization-scoped routes fail with
/// 403 for callers without one
pub(crate) fn current_org(context: &OrgContext) -> Result<&CurrentOrganization, ApiError> {
    context.current.as_ref().ok_or_else(ApiError::no_organization)
}

/// Current organization, provided the caller's role ranks at least `min_role`
pub(crate) fn require_role(context: &OrgContext, min_role: Role) -> Result<&CurrentOrganization, ApiError> {
    let current = current_org(context)?;
    if !has_permission(current.role, min_role) {
        tracing::warn!("Role {} below required {} in organization {}", current.role, min_role, current.id());
        return Err(ApiError::forbidden(format!("Requires role {} or higher", min_role)));
    }
    Ok(current)
}
