// handlers/protected/crm/events.rs - /api/crm/events handlers

use axum::{extract::State, Extension, Json};

use super::require_crm_access;
use crate::auth::org_context::OrgContext;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::crm::{TrackEventRequest, TrackedEvent};
use crate::state::AppState;

/// GET /api/crm/events - Tracked events, oldest first
pub async fn list(State(state): State<AppState>, Extension(context): Extension<OrgContext>) -> ApiResult<Vec<TrackedEvent>> {
    require_crm_access(&context)?;
    Ok(ApiResponse::success(state.crm.events().await))
}

/// POST /api/crm/events - Record an event on behalf of the caller
pub async fn track(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Json(request): Json<TrackEventRequest>,
) -> ApiResult<TrackedEvent> {
    require_crm_access(&context)?;
    let event = state.crm.track_event(request, Some(profile.id)).await?;
    Ok(ApiResponse::created(event))
}
