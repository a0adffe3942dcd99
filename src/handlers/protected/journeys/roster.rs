// handlers/protected/journeys/roster.rs - /api/journeys/:id/enrollments handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::database::models::{Enrollment, EnrollmentWithProfile};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::journey_service::EnrollUserRequest;
use crate::state::AppState;

/// GET /api/journeys/:id/enrollments - Who is enrolled and how far they got
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
) -> ApiResult<Vec<EnrollmentWithProfile>> {
    let current = current_org(&context)?;
    let roster = state.journeys().roster(current, journey_id).await?;
    Ok(ApiResponse::success(roster))
}

/// POST /api/journeys/:id/enrollments - Enroll a member on their behalf
pub async fn post(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
    Json(body): Json<EnrollUserRequest>,
) -> ApiResult<Enrollment> {
    let current = current_org(&context)?;
    let enrollment = state.journeys().enroll_user(current, journey_id, body.user_id).await?;
    Ok(ApiResponse::created(enrollment))
}
