use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::auth::authenticate;
use super::org_context::{load_context, requested_organization};
use crate::auth::guard::{evaluate, GuardDecision, GuardSession};
use crate::database::models::AccountStatus;
use crate::state::AppState;

/// Paths served by the API itself rather than by the portal's pages
pub fn is_page_path(path: &str) -> bool {
    !(path == "/"
        || path == "/health"
        || path == "/api"
        || path.starts_with("/api/")
        || path == "/auth"
        || (path.starts_with("/auth/") && path != "/auth/callback"))
}

/// Page guard. API paths pass straight through; page paths are checked
/// against the route table and redirected when the caller may not see them.
/// A bad token or an inactive account is treated as an anonymous visitor.
pub async fn page_guard_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !is_page_path(&path) {
        return next.run(request).await;
    }

    let session = guard_session(&state, request.headers()).await;
    match evaluate(&path, session.as_ref()) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(target) => {
            tracing::warn!("Page guard redirected {} to {}", path, target);
            Redirect::temporary(&target).into_response()
        }
    }
}

async fn guard_session(state: &AppState, headers: &HeaderMap) -> Option<GuardSession> {
    let security = &state.config.security;
    let user = authenticate(headers, security).ok()?;

    let profile = match state.store.get_profile(user.user_id).await {
        Ok(Some(profile)) if profile.status == AccountStatus::Active => profile,
        Ok(_) => return None,
        Err(e) => {
            tracing::error!("Page guard could not load profile {}: {}", user.user_id, e);
            return None;
        }
    };

    let requested = requested_organization(headers, security);
    let role = match load_context(state.store.as_ref(), &profile, requested).await {
        Ok(context) => context.role(),
        Err(e) => {
            tracing::error!("Page guard could not load memberships for {}: {}", profile.id, e);
            None
        }
    };

    Some(GuardSession {
        is_platform_admin: profile.is_platform_admin,
        role,
    })
}
