// handlers/protected/navigation.rs - GET /api/navigation handler

use axum::Extension;

use crate::auth::navigation::{navigation_for, Navigation};
use crate::auth::org_context::OrgContext;
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};

/// GET /api/navigation - Menu entries the caller may open
pub async fn get(
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
) -> ApiResult<Navigation> {
    Ok(ApiResponse::success(navigation_for(context.role(), profile.is_platform_admin)))
}
