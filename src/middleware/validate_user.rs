use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::database::models::{AccountStatus, Profile};
use crate::error::ApiError;
use crate::state::AppState;

/// Profile of the authenticated user, loaded from the portal database
#[derive(Clone, Debug)]
pub struct ValidatedUser(pub Profile);

/// Middleware that loads the profile behind the access token. A token
/// without a profile row is rejected, as is any account that is not active.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required before user validation"))?;

    let profile = state.store.get_profile(auth_user.user_id).await?.ok_or_else(|| {
        tracing::warn!("User validation failed: no profile for {}", auth_user.user_id);
        ApiError::unauthorized("User profile not found")
    })?;

    if profile.status != AccountStatus::Active {
        tracing::warn!("User validation failed: {} is {}", profile.id, profile.status);
        return Err(ApiError::forbidden(format!("Account is {}", profile.status)));
    }

    tracing::debug!("User validation successful: {} ({})", profile.email, profile.id);
    request.extensions_mut().insert(ValidatedUser(profile));

    Ok(next.run(request).await)
}
