// handlers/protected/profile.rs - GET/PATCH /api/profile handlers

use axum::{extract::State, Extension, Json};

use crate::database::models::{Profile, ProfileUpdate};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::state::AppState;

/// GET /api/profile - The caller's profile
pub async fn profile_get(Extension(ValidatedUser(profile)): Extension<ValidatedUser>) -> ApiResult<Profile> {
    Ok(ApiResponse::success(profile))
}

/// PATCH /api/profile - Update display name and avatar
pub async fn profile_patch(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Profile> {
    if update.is_empty() {
        return Ok(ApiResponse::success(profile));
    }
    if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::invalid_field("full_name", "Name cannot be blank"));
    }

    let updated = state.store.update_profile(profile.id, &update).await?;
    Ok(ApiResponse::success(updated))
}
