// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::middleware::cookies::session_cookie;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::identity::{IdentitySession, IdentityUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub user: IdentityUser,
}

/// POST /auth/login - Password sign-in through the identity provider
///
/// The access token is returned in the body for API clients and set as the
/// session cookie for browsers.
pub async fn login_post(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let session = state.identity.sign_in_with_password(&email, &request.password).await.map_err(|e| {
        tracing::warn!("Sign-in failed for {}: {}", email, e);
        ApiError::from(e)
    })?;
    tracing::info!("User {} signed in", session.user.id);

    Ok(session_response(session, &state.config.security))
}

/// Session in the body for API clients, and as the session cookie for browsers
pub(super) fn session_response(session: IdentitySession, security: &SecurityConfig) -> ApiResponse<LoginResponse> {
    let max_age = i64::try_from(session.expires_in).unwrap_or(i64::MAX);
    let cookie = session_cookie(&session.access_token, max_age, security);

    ApiResponse::success(LoginResponse {
        token: session.access_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
        user: session.user,
    })
    .with_cookie(cookie)
}
