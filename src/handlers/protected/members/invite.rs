// handlers/protected/members/invite.rs - POST /api/members/invite handler

use axum::{extract::State, http::StatusCode, Extension, Json};

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::member_service::{InviteOutcome, InviteRequest};
use crate::state::AppState;

/// POST /api/members/invite - Add an existing account or email an invitation
///
/// 201 when the account joined right away, 202 when an invitation was sent.
pub async fn post(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Json(request): Json<InviteRequest>,
) -> ApiResult<InviteOutcome> {
    let current = current_org(&context)?;
    let outcome = state.members().invite(current, profile.id, request).await?;

    let status = match outcome {
        InviteOutcome::Added { .. } => StatusCode::CREATED,
        InviteOutcome::Invited { .. } => StatusCode::ACCEPTED,
    };
    Ok(ApiResponse::with_status(outcome, status))
}
