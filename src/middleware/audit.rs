//! Audit trail of successful mutating requests.
//!
//! Runs innermost on the routes it wraps so the caller and organization
//! extensions are already in place. Recording is best effort: a failed write
//! is logged and the response goes out unchanged.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::auth::org_context::{self, OrgContext, ORGANIZATION_HEADER};
use crate::database::models::{AuditAction, AuditCategory, NewAuditEntry};
use crate::state::AppState;

const SERVICE_NAME: &str = "oasis-api";

pub async fn audit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    if !is_mutating(&method) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let actor_id = request.extensions().get::<AuthUser>().map(|u| u.user_id);
    let organization_id = request
        .extensions()
        .get::<OrgContext>()
        .and_then(|c| c.current.as_ref().map(|current| current.id()))
        .or_else(|| header_organization(request.headers()));
    let peer = request.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
    let ip_address = client_ip(request.headers(), peer);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let entry = NewAuditEntry {
        actor_id,
        organization_id,
        category: category(&path),
        action: action(&method, &path),
        resource: resource(&path).to_string(),
        metadata: json!({
            "service": SERVICE_NAME,
            "method": method.as_str(),
            "path": &path,
            "status": response.status().as_u16(),
        }),
        ip_address,
        user_agent,
    };

    if let Err(e) = state.store.record_audit(&entry).await {
        tracing::error!("Failed to record audit entry for {} {}: {}", method, path, e);
    }
    response
}

fn is_mutating(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

/// Path segments after the `/api` and `/v1` prefixes
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != "api" && *s != "v1")
}

pub fn resource(path: &str) -> &str {
    segments(path).next().unwrap_or("unknown")
}

pub fn category(path: &str) -> AuditCategory {
    match resource(path) {
        "auth" => AuditCategory::Auth,
        "organizations" | "orgs" | "members" => AuditCategory::Org,
        "profile" | "profiles" | "users" => AuditCategory::Profile,
        "journeys" | "enrollments" | "gamification" | "badges" => AuditCategory::Journey,
        _ => AuditCategory::System,
    }
}

pub fn action(method: &Method, path: &str) -> AuditAction {
    let has = |segment: &str| segments(path).any(|s| s == segment);

    if has("login") {
        return AuditAction::Login;
    }
    if has("logout") {
        return AuditAction::Logout;
    }
    if has("register") {
        return AuditAction::Register;
    }
    if has("password") {
        return AuditAction::PasswordChange;
    }
    if resource(path) == "members" {
        return match *method {
            Method::DELETE => AuditAction::RemoveMember,
            Method::POST if has("invite") => AuditAction::AddMember,
            _ => AuditAction::UpdateMember,
        };
    }

    match *method {
        Method::POST => AuditAction::Create,
        Method::DELETE => AuditAction::Delete,
        _ => AuditAction::Update,
    }
}

/// First hop of `X-Forwarded-For`, else the socket peer
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| peer.map(|p| p.ip().to_string()))
}

fn header_organization(headers: &HeaderMap) -> Option<Uuid> {
    org_context::parse_requested(headers.get(ORGANIZATION_HEADER).and_then(|v| v.to_str().ok()))
}
