// handlers/protected/enrollments/enroll.rs - POST /api/enrollments and /api/enrollments/:id/drop

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::database::models::Enrollment;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::enrollment_service::EnrollRequest;
use crate::state::AppState;

/// POST /api/enrollments - Enroll the caller in an active journey
pub async fn post(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Json(request): Json<EnrollRequest>,
) -> ApiResult<Enrollment> {
    let enrollment = state.enrollments().enroll(profile.id, request.journey_id).await?;
    Ok(ApiResponse::created(enrollment))
}

/// POST /api/enrollments/:id/drop - Leave a journey; progress is kept
pub async fn drop_post(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<Enrollment> {
    let enrollment = state.enrollments().drop_enrollment(profile.id, enrollment_id).await?;
    Ok(ApiResponse::success(enrollment))
}
