use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::gamification::GamificationService;
use super::{ServiceError, ServiceResult};
use crate::database::models::{
    Badge, Enrollment, EnrollmentProgress, EnrollmentStatus, EnrollmentWithJourney, JourneyStatus,
    StepCompletion,
};
use crate::database::{PortalStore, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollRequest {
    pub journey_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteStepRequest {
    #[serde(default)]
    pub submission_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepCompleted {
    pub enrollment: Enrollment,
    pub completion: StepCompletion,
    pub newly_completed: bool,
    pub badges_awarded: Vec<Badge>,
}

/// A user's own enrollments. Every operation is scoped to the caller.
pub struct EnrollmentService {
    store: Arc<dyn PortalStore>,
    gamification: GamificationService,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        let gamification = GamificationService::new(store.clone());
        Self { store, gamification }
    }

    pub async fn list(&self, caller: Uuid) -> ServiceResult<Vec<EnrollmentWithJourney>> {
        Ok(self.store.list_enrollments(caller).await?)
    }

    /// Enroll `caller` in an active journey of an organization they belong
    /// to. A dropped enrollment is reactivated instead of duplicated and
    /// picks up the completions it kept.
    pub async fn enroll(&self, caller: Uuid, journey_id: Uuid) -> ServiceResult<Enrollment> {
        let journey = self
            .store
            .get_journey(journey_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Journey not found"))?;

        let member = self.store.find_member(journey.organization_id, caller).await?;
        if !member.is_some_and(|m| m.is_active()) {
            return Err(ServiceError::forbidden("You are not a member of this journey's organization"));
        }
        if journey.status != JourneyStatus::Active {
            return Err(ServiceError::invalid("Journey is not open for enrollment"));
        }

        let enrollment = match self.store.find_enrollment(caller, journey_id).await? {
            Some(existing) if existing.is_dropped() => self.store.reactivate_enrollment(existing.id).await?,
            Some(_) => return Err(ServiceError::conflict("Already enrolled in this journey")),
            None => {
                let required =
                    self.store.list_steps(journey_id).await?.iter().filter(|s| s.is_required).count() as i32;
                match self.store.insert_enrollment(caller, journey_id, required).await {
                    Err(StoreError::Conflict(_)) => {
                        return Err(ServiceError::conflict("Already enrolled in this journey"))
                    }
                    other => other?,
                }
            }
        };

        tracing::info!("User {} enrolled in journey {}", caller, journey_id);
        Ok(enrollment)
    }

    pub async fn drop_enrollment(&self, caller: Uuid, enrollment_id: Uuid) -> ServiceResult<Enrollment> {
        self.owned(caller, enrollment_id).await?;
        Ok(self.store.set_enrollment_status(enrollment_id, EnrollmentStatus::Dropped).await?)
    }

    pub async fn progress(&self, caller: Uuid, enrollment_id: Uuid) -> ServiceResult<EnrollmentProgress> {
        let enrollment = self.owned(caller, enrollment_id).await?;
        let steps = self.store.list_steps(enrollment.journey_id).await?;
        let completions = self.store.list_completions(enrollment_id).await?;

        Ok(EnrollmentProgress::new(enrollment, steps, completions))
    }

    pub async fn complete_step(
        &self,
        caller: Uuid,
        enrollment_id: Uuid,
        step_id: Uuid,
        submission_data: Option<Value>,
    ) -> ServiceResult<StepCompleted> {
        self.owned(caller, enrollment_id).await?;

        let outcome = match self.store.complete_step(enrollment_id, step_id, submission_data).await {
            Err(StoreError::Conflict(_)) => {
                return Err(ServiceError::conflict("Enrollment has been dropped"))
            }
            Err(StoreError::NotFound(_)) => return Err(ServiceError::not_found("Step not found")),
            other => other?,
        };

        let badges_awarded = if outcome.newly_completed {
            self.gamification.award_point_badges(caller).await?
        } else {
            Vec::new()
        };

        Ok(StepCompleted {
            enrollment: outcome.enrollment,
            completion: outcome.completion,
            newly_completed: outcome.newly_completed,
            badges_awarded,
        })
    }

    /// Someone else's enrollment reads as missing
    async fn owned(&self, caller: Uuid, enrollment_id: Uuid) -> ServiceResult<Enrollment> {
        match self.store.get_enrollment(enrollment_id).await? {
            Some(e) if e.user_id == caller => Ok(e),
            _ => Err(ServiceError::not_found("Enrollment not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::demo;
    use crate::database::models::NewJourney;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, EnrollmentService) {
        let store = Arc::new(MemoryStore::demo());
        let service = EnrollmentService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn enroll_counts_required_steps() {
        let (_, service) = setup();

        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Enrolled);
        assert_eq!(enrollment.total_steps, 3);
        assert_eq!(enrollment.progress, 0);

        let again = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn dropped_enrollment_is_reactivated() {
        let (_, service) = setup();

        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        let dropped = service.drop_enrollment(demo::PARTICIPANTE, enrollment.id).await.unwrap();
        assert_eq!(dropped.status, EnrollmentStatus::Dropped);

        let back = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        assert_eq!(back.id, enrollment.id);
        assert_eq!(back.status, EnrollmentStatus::Enrolled);
    }

    #[tokio::test]
    async fn reactivation_restores_counters_from_completions() {
        let (store, service) = setup();
        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        let steps = store.list_steps(demo::JOURNEY).await.unwrap();
        for step in steps.iter().filter(|s| s.is_required) {
            service.complete_step(demo::PARTICIPANTE, enrollment.id, step.id, None).await.unwrap();
        }
        service.drop_enrollment(demo::PARTICIPANTE, enrollment.id).await.unwrap();

        let back = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        assert_eq!(back.status, EnrollmentStatus::Completed);
        assert_eq!(back.progress, 100);
        assert_eq!(back.completed_steps, 3);
        assert_eq!(back.points_earned, 90);
        assert!(back.completed_at.is_some());
    }

    #[tokio::test]
    async fn partial_enrollment_comes_back_in_progress() {
        let (store, service) = setup();
        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        let steps = store.list_steps(demo::JOURNEY).await.unwrap();
        service.complete_step(demo::PARTICIPANTE, enrollment.id, steps[0].id, None).await.unwrap();
        service.drop_enrollment(demo::PARTICIPANTE, enrollment.id).await.unwrap();

        let back = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        assert_eq!(back.status, EnrollmentStatus::InProgress);
        assert_eq!((back.completed_steps, back.total_steps, back.progress), (1, 3, 33));

        let resumed = service.complete_step(demo::PARTICIPANTE, back.id, steps[1].id, None).await.unwrap();
        assert_eq!(resumed.enrollment.progress, 67);
    }

    #[tokio::test]
    async fn deleting_the_last_missing_step_completes_enrollment() {
        let (store, service) = setup();
        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        let required: Vec<_> = store
            .list_steps(demo::JOURNEY)
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.is_required)
            .collect();
        for step in &required[..2] {
            service.complete_step(demo::PARTICIPANTE, enrollment.id, step.id, None).await.unwrap();
        }

        store.delete_step(demo::JOURNEY, required[2].id).await.unwrap();

        let progress = service.progress(demo::PARTICIPANTE, enrollment.id).await.unwrap();
        assert_eq!(progress.enrollment.status, EnrollmentStatus::Completed);
        assert_eq!(progress.enrollment.progress, 100);
        assert_eq!(progress.enrollment.total_steps, 2);
    }

    #[tokio::test]
    async fn enroll_requires_membership_and_active_journey() {
        let (store, service) = setup();

        let outsider = store.seed_profile("afuera@example.com", "Afuera", false).await;
        let result = service.enroll(outsider.id, demo::JOURNEY).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));

        let draft = store
            .insert_journey(
                demo::ORGANIZATION,
                &NewJourney { title: "Borrador".into(), description: None, cover_image_url: None, settings: json!({}) },
            )
            .await
            .unwrap();
        let result = service.enroll(demo::PARTICIPANTE, draft.id).await;
        assert!(matches!(result, Err(ServiceError::Invalid(_))));

        let result = service.enroll(demo::PARTICIPANTE, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn completing_required_steps_finishes_journey() {
        let (store, service) = setup();
        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        let steps = store.list_steps(demo::JOURNEY).await.unwrap();

        let first = service.complete_step(demo::PARTICIPANTE, enrollment.id, steps[0].id, None).await.unwrap();
        assert!(first.newly_completed);
        assert_eq!(first.enrollment.status, EnrollmentStatus::InProgress);
        assert_eq!(first.enrollment.progress, 33);
        assert_eq!(first.badges_awarded.len(), 1);

        let repeat = service.complete_step(demo::PARTICIPANTE, enrollment.id, steps[0].id, None).await.unwrap();
        assert!(!repeat.newly_completed);
        assert_eq!(repeat.enrollment.points_earned, 10);
        assert!(repeat.badges_awarded.is_empty());

        for step in steps.iter().filter(|s| s.is_required).skip(1) {
            service
                .complete_step(demo::PARTICIPANTE, enrollment.id, step.id, Some(json!({ "answer": "ok" })))
                .await
                .unwrap();
        }

        let progress = service.progress(demo::PARTICIPANTE, enrollment.id).await.unwrap();
        assert_eq!(progress.enrollment.status, EnrollmentStatus::Completed);
        assert_eq!(progress.enrollment.progress, 100);
        assert_eq!(progress.enrollment.points_earned, 90);
        assert!(progress.enrollment.completed_at.is_some());
        assert_eq!(progress.completed_step_ids.len(), 3);
    }

    #[tokio::test]
    async fn other_users_enrollments_are_hidden() {
        let (store, service) = setup();
        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        let steps = store.list_steps(demo::JOURNEY).await.unwrap();

        let result = service.complete_step(demo::FACILITADOR, enrollment.id, steps[0].id, None).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.drop_enrollment(demo::FACILITADOR, enrollment.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn dropped_enrollment_rejects_completion() {
        let (store, service) = setup();
        let enrollment = service.enroll(demo::PARTICIPANTE, demo::JOURNEY).await.unwrap();
        service.drop_enrollment(demo::PARTICIPANTE, enrollment.id).await.unwrap();
        let steps = store.list_steps(demo::JOURNEY).await.unwrap();

        let result = service.complete_step(demo::PARTICIPANTE, enrollment.id, steps[0].id, None).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }
}
