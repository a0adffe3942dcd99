// handlers/protected/enrollments/progress.rs - GET /api/enrollments/:id/progress handler

use axum::{
    extract::{Path, State},
    Extension,
};
use uuid::Uuid;

use crate::database::models::EnrollmentProgress;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::state::AppState;

/// GET /api/enrollments/:id/progress - Enrollment, steps and completed step ids
pub async fn get(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Path(enrollment_id): Path<Uuid>,
) -> ApiResult<EnrollmentProgress> {
    let progress = state.enrollments().progress(profile.id, enrollment_id).await?;
    Ok(ApiResponse::success(progress))
}
