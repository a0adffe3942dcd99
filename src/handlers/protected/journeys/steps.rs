// handlers/protected/journeys/steps.rs - /api/journeys/:id/steps/* handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::database::models::{JourneyStep, NewStep, StepReorder, StepUpdate};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/journeys/:id/steps - Append or insert a step
pub async fn post(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
    Json(step): Json<NewStep>,
) -> ApiResult<JourneyStep> {
    let current = current_org(&context)?;
    let created = state.journeys().add_step(current, journey_id, &step).await?;
    Ok(ApiResponse::created(created))
}

/// PATCH /api/journeys/:id/steps/:step_id - Partial step edit
pub async fn patch(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path((journey_id, step_id)): Path<(Uuid, Uuid)>,
    Json(update): Json<StepUpdate>,
) -> ApiResult<JourneyStep> {
    let current = current_org(&context)?;
    let step = state.journeys().update_step(current, journey_id, step_id, &update).await?;
    Ok(ApiResponse::success(step))
}

/// PATCH /api/journeys/:id/steps/reorder - Body: `{ "step_order": [ids] }`
pub async fn reorder(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
    Json(body): Json<StepReorder>,
) -> ApiResult<Vec<JourneyStep>> {
    let current = current_org(&context)?;
    let steps = state.journeys().reorder_steps(current, journey_id, &body.step_order).await?;
    Ok(ApiResponse::success(steps))
}

/// DELETE /api/journeys/:id/steps/:step_id
pub async fn delete(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path((journey_id, step_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    let current = current_org(&context)?;
    state.journeys().delete_step(current, journey_id, step_id).await?;
    Ok(ApiResponse::no_content())
}
