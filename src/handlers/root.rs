// handlers/root.rs - GET / and GET /health

use axum::extract::State;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET / - Service descriptor
pub async fn root_get(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "endpoints": {
            "public": ["/auth/login", "/auth/logout"],
            "protected": [
                "/api/auth/context",
                "/api/organizations",
                "/api/profile",
                "/api/members",
                "/api/journeys",
                "/api/enrollments",
                "/api/gamification",
                "/api/crm",
                "/api/chat",
                "/api/superset/token",
                "/api/navigation"
            ]
        }
    })))
}

/// GET /health - Store connectivity check
pub async fn health_get(State(state): State<AppState>) -> ApiResult<Value> {
    match state.store.health_check().await {
        Ok(()) => Ok(ApiResponse::success(json!({
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": "ok"
        }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("Store unavailable"))
        }
    }
}
