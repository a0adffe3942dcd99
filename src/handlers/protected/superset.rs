// handlers/protected/superset.rs - GET /api/superset/token handler

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::superset::GuestToken;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub id: Option<String>,
}

/// GET /api/superset/token?id= - Guest token for one embedded dashboard
pub async fn token_get(State(state): State<AppState>, Query(query): Query<TokenQuery>) -> ApiResult<GuestToken> {
    let dashboard_id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Dashboard ID required"))?;

    let token = state.superset.guest_token(dashboard_id).await?;
    Ok(ApiResponse::success(token))
}
