// handlers/protected/journeys/show.rs - GET /api/journeys/:id handler

use axum::{
    extract::{Path, State},
    Extension,
};
use uuid::Uuid;

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::journey_service::JourneyDetail;
use crate::state::AppState;

/// GET /api/journeys/:id - Journey with its ordered steps and the caller's enrollment
pub async fn get(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
) -> ApiResult<JourneyDetail> {
    let current = current_org(&context)?;
    let detail = state.journeys().get(current, profile.id, journey_id).await?;
    Ok(ApiResponse::success(detail))
}
