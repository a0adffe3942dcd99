// handlers/protected/journeys/list.rs - GET /api/journeys handler

use axum::{
    extract::{Query, State},
    Extension,
};

use super::super::current_org;
use crate::auth::org_context::OrgContext;
use crate::database::models::JourneyWithEnrollment;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::journey_service::JourneyQuery;
use crate::state::AppState;

/// GET /api/journeys?status=&only_enrolled= - Journeys of the current organization
pub async fn get(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
    Query(query): Query<JourneyQuery>,
) -> ApiResult<Vec<JourneyWithEnrollment>> {
    let current = current_org(&context)?;
    let journeys = state.journeys().list(current, profile.id, &query).await?;
    Ok(ApiResponse::success(journeys))
}
