// handlers/public/auth/logout.rs - POST /auth/logout handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::cookies::clear_cookie;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/logout - Expire the session and organization cookies
///
/// The access token itself stays valid until it expires; the identity
/// provider owns revocation.
pub async fn logout_post(State(state): State<AppState>) -> ApiResult<Value> {
    let security = &state.config.security;
    Ok(ApiResponse::success(json!({ "logged_out": true }))
        .with_cookie(clear_cookie(&security.session_cookie_name, security))
        .with_cookie(clear_cookie(&security.org_cookie_name, security)))
}
