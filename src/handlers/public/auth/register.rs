// handlers/public/auth/register.rs - POST /auth/register handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::identity::{IdentityUser, SignUp};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: IdentityUser,
    pub message: String,
}

/// POST /auth/register - Create an account and its portal profile
///
/// The provider emails a confirmation link; no session is issued here.
pub async fn register_post(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let email = request.email.trim().to_lowercase();
    let full_name = request.full_name.trim();

    if !email.contains('@') {
        return Err(ApiError::invalid_field("email", "A valid email is required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::invalid_field(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if full_name.is_empty() {
        return Err(ApiError::invalid_field("full_name", "Full name is required"));
    }

    let account = SignUp { email: &email, password: &request.password, full_name };
    let user = state.identity.sign_up(&account).await.map_err(|e| {
        tracing::warn!("Registration failed for {}: {}", email, e);
        ApiError::from(e)
    })?;

    state.store.ensure_profile(user.id, &email, Some(full_name)).await?;
    tracing::info!("Registered user {}", user.id);

    Ok(ApiResponse::created(RegisterResponse {
        user,
        message: "Check your email to confirm your account".to_string(),
    }))
}
