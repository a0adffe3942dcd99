use axum::{
    http::{header, HeaderName, HeaderValue, Method, Uri},
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::org_context::ORGANIZATION_HEADER;
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public, root};
use crate::middleware::{
    audit_middleware, jwt_auth_middleware, org_context_middleware, page_guard_middleware,
    validate_user_middleware,
};
use crate::state::AppState;

/// Build the full router around shared state
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security, state.config.is_production_like());

    Router::new()
        // Public
        .route("/", get(root::root_get))
        .route("/health", get(root::health_get))
        .merge(auth_public_routes(state.clone()))
        // Protected API
        .merge(protected_routes(state.clone()))
        .fallback(fallback)
        // Global middleware
        .layer(from_fn_with_state(state.clone(), page_guard_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_public_routes(state: AppState) -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::login_post))
        .route("/auth/logout", post(auth::logout_post))
        .route("/auth/register", post(auth::register_post))
        .route("/auth/refresh", post(auth::refresh_post))
        .route("/auth/password/reset", post(auth::password_reset_post))
        .route("/auth/password/update", post(auth::password_update_post))
        .layer(from_fn_with_state(state, audit_middleware))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(session_routes())
        .merge(member_routes())
        .merge(journey_routes())
        .merge(enrollment_routes())
        .merge(gamification_routes())
        .merge(crm_routes())
        .route("/api/chat", post(protected::chat::chat_post))
        .route("/api/superset/token", get(protected::superset::token_get))
        // Layers run bottom-up: token, then profile, then organization, then audit
        .layer(from_fn_with_state(state.clone(), audit_middleware))
        .layer(from_fn_with_state(state.clone(), org_context_middleware))
        .layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn session_routes() -> Router<AppState> {
    use protected::{auth, navigation, organizations, profile};

    Router::new()
        .route("/api/auth/context", get(auth::context_get))
        .route("/api/navigation", get(navigation::get))
        .route("/api/organizations", get(organizations::list_get).post(organizations::create_post))
        .route(
            "/api/organizations/current",
            get(organizations::current_get)
                .post(organizations::current_switch)
                .patch(organizations::current_patch),
        )
        .route("/api/profile", get(profile::profile_get).patch(profile::profile_patch))
}

fn member_routes() -> Router<AppState> {
    use axum::routing::delete;
    use protected::members;

    Router::new()
        .route("/api/members", get(members::list_get))
        .route("/api/members/invite", post(members::invite_post))
        .route("/api/members/:id", delete(members::member_delete))
        .route("/api/members/:id/role", patch(members::member_role_patch))
        .route("/api/members/:id/suspend", post(members::member_suspend))
        .route("/api/members/:id/reactivate", post(members::member_reactivate))
        .route("/api/members/:id/resend-invitation", post(members::member_resend))
}

fn journey_routes() -> Router<AppState> {
    use protected::journeys;

    Router::new()
        .route("/api/journeys", get(journeys::list_get).post(journeys::journey_create))
        .route(
            "/api/journeys/:id",
            get(journeys::show_get)
                .patch(journeys::journey_update)
                .delete(journeys::journey_delete),
        )
        .route("/api/journeys/:id/publish", post(journeys::journey_publish))
        .route("/api/journeys/:id/archive", post(journeys::journey_archive))
        .route("/api/journeys/:id/steps", post(journeys::step_post))
        .route("/api/journeys/:id/steps/reorder", patch(journeys::steps_reorder))
        .route(
            "/api/journeys/:id/steps/:step_id",
            patch(journeys::step_patch).delete(journeys::step_delete),
        )
        .route(
            "/api/journeys/:id/enrollments",
            get(journeys::roster_get).post(journeys::roster_post),
        )
}

fn enrollment_routes() -> Router<AppState> {
    use protected::enrollments;

    Router::new()
        .route("/api/enrollments", get(enrollments::list_get).post(enrollments::enroll_post))
        .route("/api/enrollments/:id/drop", post(enrollments::drop_post))
        .route("/api/enrollments/:id/progress", get(enrollments::progress_get))
        .route(
            "/api/enrollments/:id/steps/:step_id/complete",
            post(enrollments::step_complete_post),
        )
}

fn gamification_routes() -> Router<AppState> {
    use protected::gamification;

    Router::new()
        .route("/api/badges", get(gamification::catalogue_get))
        .route("/api/gamification/stats", get(gamification::stats_get))
        .route("/api/gamification/badges", get(gamification::badges_get))
        .route("/api/gamification/leaderboard", get(gamification::leaderboard_get))
}

fn crm_routes() -> Router<AppState> {
    use protected::crm;

    Router::new()
        .route("/api/crm/contacts", get(crm::contacts_list).post(crm::contact_create))
        .route("/api/crm/contacts/:id", get(crm::contact_show))
        .route("/api/crm/workshops", get(crm::workshops_list).post(crm::workshop_create))
        .route("/api/crm/workshops/:id", get(crm::workshop_show))
        .route("/api/crm/events", get(crm::events_list).post(crm::event_track))
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

/// Credentialed CORS for the configured portal origins. Development without
/// configured origins stays permissive.
fn cors_layer(security: &SecurityConfig, production_like: bool) -> CorsLayer {
    if security.cors_origins.is_empty() && !production_like {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(ORGANIZATION_HEADER),
        ])
}
