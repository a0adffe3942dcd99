//! Points, levels, badges and the organization leaderboard.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::ServiceResult;
use crate::database::models::{Badge, EarnedBadge, EnrollmentStatus, EnrollmentWithJourney};
use crate::database::{LeaderboardRow, PortalStore};

/// Minimum points for each level, lowest first
pub const LEVEL_THRESHOLDS: [i32; 10] = [0, 100, 300, 600, 1000, 1500, 2100, 2800, 3600, 4500];

pub const LEVEL_NAMES: [&str; 10] = [
    "Novato",
    "Aprendiz",
    "Explorador",
    "Aventurero",
    "Veterano",
    "Experto",
    "Maestro",
    "Leyenda",
    "Campeón",
    "Héroe",
];

/// Points past the top threshold that count as a full bar
const TOP_LEVEL_SPAN: i32 = 500;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

const ANONYMOUS_NAME: &str = "Usuario";

/// 1-based level reached with `points`
pub fn level_for_points(points: i32) -> usize {
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| points >= threshold)
        .map_or(1, |index| index + 1)
}

pub fn level_name(level: usize) -> &'static str {
    LEVEL_NAMES.get(level.saturating_sub(1)).copied().unwrap_or(LEVEL_NAMES[0])
}

/// Percent of the way from the current level's threshold to the next one
pub fn level_progress(points: i32) -> i32 {
    let level = level_for_points(points);
    let current = LEVEL_THRESHOLDS[level - 1];
    let next = LEVEL_THRESHOLDS.get(level).copied().unwrap_or(current + TOP_LEVEL_SPAN);

    let percent = (100.0 * (points - current) as f64 / (next - current) as f64).round() as i32;
    percent.clamp(0, 100)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_points: i32,
    pub level: usize,
    pub level_name: &'static str,
    pub level_progress: i32,
    pub journeys_completed: usize,
    pub journeys_in_progress: usize,
    pub badges_earned: usize,
    /// Position on the current organization's leaderboard
    pub rank: Option<usize>,
}

/// Aggregate a user's enrollments and badges
pub fn user_stats(enrollments: &[EnrollmentWithJourney], badges: &[EarnedBadge]) -> UserStats {
    let total_points = enrollments.iter().map(|e| e.enrollment.points_earned).sum();
    let level = level_for_points(total_points);

    let count = |pred: fn(EnrollmentStatus) -> bool| enrollments.iter().filter(|e| pred(e.enrollment.status)).count();

    UserStats {
        total_points,
        level,
        level_name: level_name(level),
        level_progress: level_progress(total_points),
        journeys_completed: count(|s| s == EnrollmentStatus::Completed),
        journeys_in_progress: count(|s| matches!(s, EnrollmentStatus::Enrolled | EnrollmentStatus::InProgress)),
        badges_earned: badges.len(),
        rank: None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub points: i32,
    pub level: usize,
    pub badges_count: i64,
}

/// Rank users by the points of their non-dropped enrollments. Ties are
/// broken by name, then id, so the order is stable.
pub fn leaderboard(rows: &[LeaderboardRow], limit: usize) -> Vec<LeaderboardEntry> {
    let mut totals: HashMap<Uuid, LeaderboardEntry> = HashMap::new();

    for row in rows.iter().filter(|r| r.status != EnrollmentStatus::Dropped) {
        let entry = totals.entry(row.user_id).or_insert_with(|| LeaderboardEntry {
            rank: 0,
            user_id: row.user_id,
            full_name: row.full_name.clone().unwrap_or_else(|| ANONYMOUS_NAME.to_string()),
            avatar_url: row.avatar_url.clone(),
            points: 0,
            level: 1,
            badges_count: row.badges_count,
        });
        entry.points += row.points_earned;
    }

    let mut entries: Vec<LeaderboardEntry> = totals.into_values().collect();
    entries.sort_by(|a, b| match b.points.cmp(&a.points) {
        Ordering::Equal => a.full_name.cmp(&b.full_name).then(a.user_id.cmp(&b.user_id)),
        other => other,
    });

    entries
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, mut entry)| {
            entry.rank = index + 1;
            entry.level = level_for_points(entry.points);
            entry
        })
        .collect()
}

pub struct GamificationService {
    store: Arc<dyn PortalStore>,
}

impl GamificationService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    /// Stats for `user_id`, ranked within `org_id` when one is selected
    pub async fn stats(&self, user_id: Uuid, org_id: Option<Uuid>) -> ServiceResult<UserStats> {
        let enrollments = self.store.list_enrollments(user_id).await?;
        let badges = self.store.list_user_badges(user_id).await?;
        let mut stats = user_stats(&enrollments, &badges);

        if let Some(org_id) = org_id {
            let rows = self.store.leaderboard_rows(org_id).await?;
            stats.rank = leaderboard(&rows, usize::MAX)
                .iter()
                .find(|e| e.user_id == user_id)
                .map(|e| e.rank);
        }
        Ok(stats)
    }

    /// Every badge the portal can award, cheapest first
    pub async fn catalogue(&self) -> ServiceResult<Vec<Badge>> {
        Ok(self.store.list_badges().await?)
    }

    pub async fn badges(&self, user_id: Uuid) -> ServiceResult<Vec<EarnedBadge>> {
        Ok(self.store.list_user_badges(user_id).await?)
    }

    pub async fn leaderboard(&self, org_id: Uuid, limit: Option<usize>) -> ServiceResult<Vec<LeaderboardEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT).clamp(1, MAX_LEADERBOARD_LIMIT);
        let rows = self.store.leaderboard_rows(org_id).await?;
        Ok(leaderboard(&rows, limit))
    }

    /// Grant every point badge the user now qualifies for. Returns the
    /// badges granted by this call.
    pub async fn award_point_badges(&self, user_id: Uuid) -> ServiceResult<Vec<Badge>> {
        let total: i32 = self
            .store
            .list_enrollments(user_id)
            .await?
            .iter()
            .map(|e| e.enrollment.points_earned)
            .sum();

        let mut awarded = Vec::new();
        for badge in self.store.list_badges().await? {
            let Some(required) = badge.points_required else { continue };
            if total >= required && self.store.award_badge(user_id, badge.id).await? {
                tracing::info!("Awarded badge '{}' to {}", badge.name, user_id);
                awarded.push(badge);
            }
        }
        Ok(awarded)
    }
}
