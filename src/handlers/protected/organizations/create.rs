// handlers/protected/organizations/create.rs - POST /api/organizations

use axum::{extract::State, Extension, Json};

use crate::auth::org_context::CurrentOrganization;
use crate::database::models::NewOrganization;
use crate::middleware::cookies::org_cookie;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::state::AppState;

/// POST /api/organizations - Create an organization owned by the caller
///
/// The new organization becomes the caller's current one.
pub async fn post(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Json(organization): Json<NewOrganization>,
) -> ApiResult<CurrentOrganization> {
    let created = state.organizations().create(profile.id, &organization).await?;
    let cookie = org_cookie(&created.id().to_string(), &state.config.security);
    Ok(ApiResponse::created(created).with_cookie(cookie))
}
