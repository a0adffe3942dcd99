// handlers/public/auth/refresh.rs - POST /auth/refresh handler

use axum::{extract::State, Json};
use serde::Deserialize;

use super::login::{session_response, LoginResponse};
use crate::error::ApiError;
use crate::middleware::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh - Trade a refresh token for a new session
pub async fn refresh_post(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<LoginResponse> {
    if request.refresh_token.trim().is_empty() {
        return Err(ApiError::bad_request("refresh_token is required"));
    }

    let session = state.identity.refresh_session(request.refresh_token.trim()).await.map_err(|e| {
        tracing::warn!("Session refresh failed: {}", e);
        ApiError::from(e)
    })?;
    tracing::debug!("Refreshed session for {}", session.user.id);

    Ok(session_response(session, &state.config.security))
}
