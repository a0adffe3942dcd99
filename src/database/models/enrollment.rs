//! Enrollments and step completions.
//!
//! The counters on [`Enrollment`] are denormalized. They are only ever
//! written by [`Enrollment::apply_completions`], which derives them from the
//! full completion set, so replaying a completion can never double count.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{decode_text, Journey, JourneyStep, ProfileSummary};

crate::string_enum! {
    pub enum EnrollmentStatus {
        Enrolled => "enrolled",
        InProgress => "in_progress",
        Completed => "completed",
        Dropped => "dropped",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub user_id: Uuid,
    pub status: EnrollmentStatus,
    /// Percentage of required steps completed, 0..=100
    pub progress: i32,
    pub completed_steps: i32,
    /// Number of required steps in the journey
    pub total_steps: i32,
    pub points_earned: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn is_dropped(&self) -> bool {
        self.status == EnrollmentStatus::Dropped
    }

    /// Recompute every counter and the status from the journey's steps and
    /// the enrollment's completions. Without any completion the enrollment
    /// is back to `enrolled`, so this also reactivates a dropped enrollment.
    pub fn apply_completions(
        &mut self,
        steps: &[JourneyStep],
        completions: &[StepCompletion],
        now: DateTime<Utc>,
    ) {
        let completed: HashSet<Uuid> = completions.iter().map(|c| c.step_id).collect();
        let required: Vec<&JourneyStep> = steps.iter().filter(|s| s.is_required).collect();

        let total = required.len() as i32;
        let done = required.iter().filter(|s| completed.contains(&s.id)).count() as i32;

        self.total_steps = total;
        self.completed_steps = done;
        self.progress = progress_percent(done, total);
        self.points_earned = completions.iter().map(|c| c.points_awarded).sum();

        if completions.is_empty() {
            self.status = EnrollmentStatus::Enrolled;
            self.progress = 0;
            self.completed_at = None;
        } else if done == total {
            self.status = EnrollmentStatus::Completed;
            self.completed_at = self.completed_at.or(Some(now));
        } else {
            self.status = EnrollmentStatus::InProgress;
            self.completed_at = None;
        }
    }
}

/// `round(100 * done / total)`, or 100 for a journey without required steps
pub fn progress_percent(done: i32, total: i32) -> i32 {
    if total <= 0 {
        return 100;
    }
    let percent = (100.0 * done as f64 / total as f64).round() as i32;
    percent.clamp(0, 100)
}

impl<'r> FromRow<'r, PgRow> for Enrollment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            journey_id: row.try_get("journey_id")?,
            user_id: row.try_get("user_id")?,
            status: decode_text(row, "status")?,
            progress: row.try_get("progress")?,
            completed_steps: row.try_get("completed_steps")?,
            total_steps: row.try_get("total_steps")?,
            points_earned: row.try_get("points_earned")?,
            enrolled_at: row.try_get("enrolled_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StepCompletion {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub step_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub points_awarded: i32,
    pub submission_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentWithJourney {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub journey: Journey,
}

/// One row of a journey roster
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentWithProfile {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub user: ProfileSummary,
}

/// Everything the journey player needs to render one enrollment
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentProgress {
    pub enrollment: Enrollment,
    pub steps: Vec<JourneyStep>,
    pub completions: Vec<StepCompletion>,
    pub completed_step_ids: Vec<Uuid>,
}

impl EnrollmentProgress {
    pub fn new(enrollment: Enrollment, steps: Vec<JourneyStep>, completions: Vec<StepCompletion>) -> Self {
        let completed_step_ids = completions.iter().map(|c| c.step_id).collect();
        Self { enrollment, steps, completions, completed_step_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::StepType;
    use serde_json::json;

    fn step(points: i32, is_required: bool) -> JourneyStep {
        let now = Utc::now();
        JourneyStep {
            id: Uuid::new_v4(),
            journey_id: Uuid::nil(),
            title: "Paso".to_string(),
            description: None,
            step_type: StepType::Task,
            order: 0,
            points,
            content: json!({}),
            is_required,
            created_at: now,
            updated_at: now,
        }
    }

    fn completion(step: &JourneyStep) -> StepCompletion {
        StepCompletion {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::nil(),
            step_id: step.id,
            completed_at: Utc::now(),
            points_awarded: step.points,
            submission_data: None,
        }
    }

    fn enrollment() -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            journey_id: Uuid::nil(),
            user_id: Uuid::new_v4(),
            status: EnrollmentStatus::Enrolled,
            progress: 0,
            completed_steps: 0,
            total_steps: 0,
            points_earned: 0,
            enrolled_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(0, 0), 100);
    }

    #[test]
    fn counters_follow_required_completions() {
        let steps = vec![step(10, true), step(20, true), step(30, true), step(5, false)];
        let mut e = enrollment();
        let now = Utc::now();

        let mut done = Vec::new();
        for (n, s) in steps.iter().take(3).enumerate() {
            done.push(completion(s));
            e.apply_completions(&steps, &done, now);
            let n = n as i32 + 1;
            assert_eq!(e.completed_steps, n);
            assert_eq!(e.total_steps, 3);
            assert_eq!(e.progress, progress_percent(n, 3));
            assert_eq!(e.status == EnrollmentStatus::Completed, n == 3);
        }
        assert_eq!(e.points_earned, 60);
        assert_eq!(e.completed_at, Some(now));
    }

    #[test]
    fn optional_steps_add_points_without_progress() {
        let steps = vec![step(10, true), step(5, false)];
        let mut e = enrollment();
        e.apply_completions(&steps, &[completion(&steps[1])], Utc::now());

        assert_eq!(e.progress, 0);
        assert_eq!(e.points_earned, 5);
        assert_eq!(e.status, EnrollmentStatus::InProgress);
        assert!(e.completed_at.is_none());
    }

    #[test]
    fn replayed_completion_does_not_double_count() {
        let steps = vec![step(10, true), step(10, true)];
        let mut e = enrollment();
        let first = completion(&steps[0]);
        e.apply_completions(&steps, &[first.clone()], Utc::now());
        let snapshot = (e.progress, e.completed_steps);

        e.apply_completions(&steps, &[first], Utc::now());
        assert_eq!((e.progress, e.completed_steps), snapshot);
        assert_eq!(e.progress, 50);
    }

    #[test]
    fn counters_follow_changes_to_the_step_list() {
        let mut steps = vec![step(10, true), step(20, true), step(30, true)];
        let done = vec![completion(&steps[0]), completion(&steps[1])];
        let mut e = enrollment();
        let now = Utc::now();

        e.apply_completions(&steps, &done, now);
        assert_eq!((e.completed_steps, e.total_steps, e.progress), (2, 3, 67));
        assert_eq!(e.status, EnrollmentStatus::InProgress);

        steps.pop();
        e.apply_completions(&steps, &done, now);
        assert_eq!((e.completed_steps, e.total_steps, e.progress), (2, 2, 100));
        assert_eq!(e.status, EnrollmentStatus::Completed);

        steps.push(step(5, true));
        e.apply_completions(&steps, &done, now);
        assert_eq!(e.status, EnrollmentStatus::InProgress);
        assert!(e.completed_at.is_none());
    }

    #[test]
    fn dropped_enrollment_comes_back_with_its_history() {
        let steps = vec![step(10, true), step(20, true)];
        let mut e = enrollment();
        e.status = EnrollmentStatus::Dropped;
        e.progress = 100;
        e.completed_at = Some(Utc::now());

        e.apply_completions(&steps, &[], Utc::now());
        assert_eq!(e.status, EnrollmentStatus::Enrolled);
        assert_eq!((e.progress, e.completed_steps, e.points_earned), (0, 0, 0));
        assert!(e.completed_at.is_none());

        e.status = EnrollmentStatus::Dropped;
        e.apply_completions(&steps, &[completion(&steps[0]), completion(&steps[1])], Utc::now());
        assert_eq!(e.status, EnrollmentStatus::Completed);
        assert_eq!(e.progress, 100);
    }

    #[test]
    fn journey_without_required_steps_completes() {
        let steps = vec![step(5, false)];
        let mut e = enrollment();
        e.apply_completions(&steps, &[completion(&steps[0])], Utc::now());
        assert_eq!(e.progress, 100);
        assert_eq!(e.status, EnrollmentStatus::Completed);
    }
}
