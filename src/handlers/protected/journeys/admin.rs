// handlers/protected/journeys/admin.rs - Journey authoring handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::database::models::{Journey, JourneyUpdate, NewJourney};
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /api/journeys - Create a draft journey
pub async fn create(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Json(journey): Json<NewJourney>,
) -> ApiResult<Journey> {
    let current = current_org(&context)?;
    let created = state.journeys().create(current, &journey).await?;
    Ok(ApiResponse::created(created))
}

/// PATCH /api/journeys/:id - Edit title, description, cover or settings
pub async fn update(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
    Json(update): Json<JourneyUpdate>,
) -> ApiResult<Journey> {
    let current = current_org(&context)?;
    let journey = state.journeys().update(current, journey_id, &update).await?;
    Ok(ApiResponse::success(journey))
}

/// DELETE /api/journeys/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
) -> ApiResult<()> {
    let current = current_org(&context)?;
    state.journeys().delete(current, journey_id).await?;
    Ok(ApiResponse::no_content())
}

/// POST /api/journeys/:id/publish - Open the journey for enrollment
pub async fn publish(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
) -> ApiResult<Journey> {
    let current = current_org(&context)?;
    let journey = state.journeys().publish(current, journey_id).await?;
    Ok(ApiResponse::success(journey))
}

/// POST /api/journeys/:id/archive
pub async fn archive(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(journey_id): Path<Uuid>,
) -> ApiResult<Journey> {
    let current = current_org(&context)?;
    let journey = state.journeys().archive(current, journey_id).await?;
    Ok(ApiResponse::success(journey))
}
