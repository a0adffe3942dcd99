// handlers/protected/members/list.rs - GET /api/members handler

use axum::{extract::State, Extension};

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::database::models::MemberWithProfile;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/members - Members of the current organization, highest role first
pub async fn get(State(state): State<AppState>, Extension(context): Extension<OrgContext>) -> ApiResult<Vec<MemberWithProfile>> {
    let current = current_org(&context)?;
    let members = state.members().list(current).await?;
    Ok(ApiResponse::success(members))
}
