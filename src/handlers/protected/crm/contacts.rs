// handlers/protected/crm/contacts.rs - /api/crm/contacts handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use super::require_crm_access;
use crate::auth::org_context::OrgContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::crm::{Contact, NewContact};
use crate::state::AppState;

/// GET /api/crm/contacts - All contacts; reseeds when the directory runs low
pub async fn list(State(state): State<AppState>, Extension(context): Extension<OrgContext>) -> ApiResult<Vec<Contact>> {
    require_crm_access(&context)?;
    Ok(ApiResponse::success(state.crm.contacts().await?))
}

/// GET /api/crm/contacts/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Path(contact_id): Path<Uuid>,
) -> ApiResult<Contact> {
    require_crm_access(&context)?;
    Ok(ApiResponse::success(state.crm.contact(contact_id).await?))
}

/// POST /api/crm/contacts - Add a contact; level and status follow the engagement score
pub async fn create(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Json(input): Json<NewContact>,
) -> ApiResult<Contact> {
    require_crm_access(&context)?;
    Ok(ApiResponse::created(state.crm.create_contact(input).await?))
}
