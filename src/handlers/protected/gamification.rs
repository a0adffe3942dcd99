// handlers/protected/gamification.rs - /api/gamification/* handlers

use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;

use super::current_org;
use crate::auth::org_context::OrgContext;
use crate::database::models::{Badge, EarnedBadge};
use crate::middleware::{ApiResponse, ApiResult, ValidatedUser};
use crate::services::gamification::{LeaderboardEntry, UserStats};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// GET /api/gamification/stats - Points, level and rank of the caller
pub async fn stats_get(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
    Extension(context): Extension<OrgContext>,
) -> ApiResult<UserStats> {
    let org_id = context.current.as_ref().map(|c| c.id());
    let stats = state.gamification().stats(profile.id, org_id).await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/badges - The badge catalogue
pub async fn catalogue_get(State(state): State<AppState>) -> ApiResult<Vec<Badge>> {
    let badges = state.gamification().catalogue().await?;
    Ok(ApiResponse::success(badges))
}

/// GET /api/gamification/badges - Badges the caller has earned
pub async fn badges_get(
    State(state): State<AppState>,
    Extension(ValidatedUser(profile)): Extension<ValidatedUser>,
) -> ApiResult<Vec<EarnedBadge>> {
    let badges = state.gamification().badges(profile.id).await?;
    Ok(ApiResponse::success(badges))
}

/// GET /api/gamification/leaderboard?limit= - Ranking of the current organization
pub async fn leaderboard_get(
    State(state): State<AppState>,
    Extension(context): Extension<OrgContext>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let current = current_org(&context)?;
    let entries = state.gamification().leaderboard(current.id(), query.limit).await?;
    Ok(ApiResponse::success(entries))
}
