// handlers/protected/crm/workshops.rs - /api/crm/workshops handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use super::require_crm_access;
use crate::auth::org_context::OrgContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::crm::{NewWorkshop, Workshop};
use crate::state::AppState;

/// GET /api/crm/workshops
pub async fn list(State(state): State<AppState>, Extension(context): Extension<OrgContext>) -> ApiResult<Vec<Workshop>> {
    require_crm_access(&context)?;
    Ok(ApiResponse::success(state.crm.workshops().await?))
}

/// GET /api/crm/workshops/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(workshop_id): Path<Uuid>,
) -> ApiResult<Workshop> {
    require_crm_access(&context)?;
    Ok(ApiResponse::success(state.crm.workshop(workshop_id).await?))
}

/// POST /api/crm/workshops - Schedule a workshop as a draft
pub async fn create(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Json(input): Json<NewWorkshop>,
) -> ApiResult<Workshop> {
    require_crm_access(&context)?;
    Ok(ApiResponse::created(state.crm.create_workshop(input).await?))
}
