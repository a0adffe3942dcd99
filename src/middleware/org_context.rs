use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::cookies::read_cookie;
use super::validate_user::ValidatedUser;
use crate::auth::org_context::{self, CurrentOrganization, OrgContext, ORGANIZATION_HEADER};
use crate::config::SecurityConfig;
use crate::database::models::Profile;
use crate::database::{PortalStore, StoreResult};
use crate::error::ApiError;
use crate::state::AppState;

/// Middleware that resolves the organization the request acts on and
/// inserts an [`OrgContext`]. A user without memberships still gets a
/// context, with no current organization.
pub async fn org_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ValidatedUser(profile) = request
        .extensions()
        .get::<ValidatedUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("User validation required before organization context"))?;

    let requested = requested_organization(request.headers(), &state.config.security);
    let context = load_context(state.store.as_ref(), &profile, requested).await?;

    if let Some(current) = &context.current {
        tracing::debug!("Request acts on organization {} as {}", current.id(), current.role);
    }
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Organization id requested by the client. The header wins over the cookie.
pub fn requested_organization(headers: &HeaderMap, security: &SecurityConfig) -> Option<Uuid> {
    let from_header = headers.get(ORGANIZATION_HEADER).and_then(|v| v.to_str().ok());
    if let Some(id) = org_context::parse_requested(from_header) {
        return Some(id);
    }

    let from_cookie = read_cookie(headers, &security.org_cookie_name);
    org_context::parse_requested(from_cookie.as_deref())
}

/// Build the organization context for a user. Platform admins asking for
/// an organization they do not belong to act on it as owner.
pub async fn load_context(
    store: &dyn PortalStore,
    profile: &Profile,
    requested: Option<Uuid>,
) -> StoreResult<OrgContext> {
    let memberships = store.active_memberships(profile.id).await?;

    let mut current = org_context::resolve(&memberships, requested).map(CurrentOrganization::from_membership);

    if let Some(requested_id) = requested {
        let is_member = current.as_ref().is_some_and(|c| c.id() == requested_id);
        if !is_member && profile.is_platform_admin {
            if let Some(organization) = store.get_organization(requested_id).await? {
                tracing::info!("Platform admin {} acting on organization {}", profile.id, requested_id);
                current = Some(CurrentOrganization::platform_override(organization));
            }
        }
    }

    Ok(OrgContext { memberships, current })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::config::AppConfig;
    use crate::database::memory::demo;
    use crate::database::MemoryStore;
    use axum::http::{header, HeaderValue};

    #[test]
    fn header_takes_precedence_over_cookie() {
        let security = AppConfig::development().security;
        let from_header = Uuid::new_v4();
        let from_cookie = Uuid::new_v4();

        let mut headers = HeaderMap::new();
        let cookie = format!("oasis_current_org={}", from_cookie);
        headers.insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
        assert_eq!(requested_organization(&headers, &security), Some(from_cookie));

        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_str(&from_header.to_string()).unwrap());
        assert_eq!(requested_organization(&headers, &security), Some(from_header));

        headers.insert(ORGANIZATION_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(requested_organization(&headers, &security), Some(from_cookie));
    }

    #[tokio::test]
    async fn members_fall_back_to_their_membership() {
        let store = MemoryStore::demo();
        let profile = store.get_profile(demo::ADMIN).await.unwrap().unwrap();

        let context = load_context(&store, &profile, Some(Uuid::new_v4())).await.unwrap();
        let current = context.current.unwrap();
        assert_eq!(current.id(), demo::ORGANIZATION);
        assert_eq!(current.role, Role::Admin);
    }

    #[tokio::test]
    async fn platform_admin_acts_as_owner() {
        let store = MemoryStore::demo();
        let staff = store.get_profile(demo::PLATFORM_ADMIN).await.unwrap().unwrap();

        let context = load_context(&store, &staff, None).await.unwrap();
        assert!(context.current.is_none());

        let context = load_context(&store, &staff, Some(demo::ORGANIZATION)).await.unwrap();
        let current = context.current.unwrap();
        assert_eq!(current.role, Role::Owner);
        assert!(current.membership.is_none());
        assert!(context.memberships.is_empty());
    }

    #[tokio::test]
    async fn regular_users_get_no_override() {
        let store = MemoryStore::demo();
        let outsider = store.seed_profile("afuera@example.com", "Afuera", false).await;

        let context = load_context(&store, &outsider, Some(demo::ORGANIZATION)).await.unwrap();
        assert!(context.current.is_none());
    }
}
