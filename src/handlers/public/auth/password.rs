// handlers/public/auth/password.rs - /auth/password/* handlers

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::register::MIN_PASSWORD_LEN;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::identity::IdentityError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    /// Access token from the recovery link
    pub token: String,
    pub new_password: String,
}

/// POST /auth/password/reset - Email a recovery link
///
/// Answers the same whether or not the address has an account.
pub async fn reset_post(State(state): State<AppState>, Json(request): Json<ResetRequest>) -> ApiResult<Value> {
    let email = request.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::invalid_field("email", "A valid email is required"));
    }

    match state.identity.send_password_reset(&email).await {
        Ok(()) => tracing::info!("Password reset requested for {}", email),
        Err(IdentityError::NotConfigured) => return Err(IdentityError::NotConfigured.into()),
        Err(e) => tracing::warn!("Password reset for {} failed: {}", email, e),
    }

    Ok(ApiResponse::success(json!({
        "message": "If the email is registered, a reset link has been sent"
    })))
}

/// POST /auth/password/update - Set a new password with a recovery token
pub async fn update_post(State(state): State<AppState>, Json(request): Json<UpdateRequest>) -> ApiResult<Value> {
    if request.token.trim().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }
    if request.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid_field(
            "new_password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    state
        .identity
        .update_password(request.token.trim(), &request.new_password)
        .await
        .map_err(|e| {
            tracing::warn!("Password update failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(ApiResponse::success(json!({ "message": "Password updated" })))
}
