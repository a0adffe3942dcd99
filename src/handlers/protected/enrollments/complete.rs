// handlers/protected/enrollments/complete.rs - POST /api/enrollments/:id/steps/:step_id/complete

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::enrollment_service::{CompleteStepRequest, StepCompleted};
use crate::state::AppState;

/// POST /api/enrollments/:id/steps/:step_id/complete - Record a step completion
///
/// The body is optional. Completing a step twice returns the first
/// completion with `newly_completed: false`.
pub async fn post(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Path((enrollment_id, step_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<CompleteStepRequest>>,
) -> ApiResult<StepCompleted> {
    let submission_data = body.and_then(|Json(request)| request.submission_data);

    let completed = state
        .enrollments()
        .complete_step(profile.id, enrollment_id, step_id, submission_data)
        .await?;
    Ok(ApiResponse::success(completed))
}
