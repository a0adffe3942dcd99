use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::cookies::read_cookie;
use crate::auth::{bearer_token, validate_token, AuthError, Claims};
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(request.headers(), &state.config.security)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Validate the request's access token. API clients send it as a bearer
/// token; browsers carry it in the session cookie.
pub fn authenticate(headers: &HeaderMap, security: &SecurityConfig) -> Result<AuthUser, AuthError> {
    let token = extract_token(headers, security)?;
    let claims = validate_token(&token, security)?;
    Ok(AuthUser::from(claims))
}

fn extract_token(headers: &HeaderMap, security: &SecurityConfig) -> Result<String, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        return bearer_token(value).map(str::to_string);
    }

    read_cookie(headers, &security.session_cookie_name).ok_or(AuthError::MissingToken)
}
