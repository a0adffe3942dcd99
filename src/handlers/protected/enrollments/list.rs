// handlers/protected/enrollments/list.rs - GET /api/enrollments handler

use axum::{extract::State, Extension};

use crate::database::models::EnrollmentWithJourney;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::state::AppState;

/// GET /api/enrollments - The caller's enrollments with their journeys, newest first
pub async fn get(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
) -> ApiResult<Vec<EnrollmentWithJourney>> {
    let enrollments = state.enrollments().list(profile.id).await?;
    Ok(ApiResponse::success(enrollments))
}
