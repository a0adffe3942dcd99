use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enrollment_service::EnrollmentService;
use super::{authorize, ServiceError, ServiceResult};
use crate::auth::org_context::CurrentOrganization;
use crate::auth::{can_perform, Permission};
use crate::database::models::{
    Enrollment, EnrollmentWithProfile, Journey, JourneyStatus, JourneyStep, JourneyUpdate,
    JourneyWithEnrollment, NewJourney, NewStep, StepUpdate,
};
use crate::database::{PortalStore, StoreError};

/// Query string of `GET /api/journeys`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JourneyQuery {
    pub status: Option<JourneyStatus>,
    #[serde(default)]
    pub only_enrolled: bool,
}

/// Body of `POST /api/journeys/:id/enrollments`
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollUserRequest {
    pub user_id: Uuid,
}

/// Journey with its ordered steps and the caller's enrollment
#[derive(Debug, Clone, Serialize)]
pub struct JourneyDetail {
    #[serde(flatten)]
    pub journey: JourneyWithEnrollment,
    pub steps: Vec<JourneyStep>,
}

pub struct JourneyService {
    store: Arc<dyn PortalStore>,
}

impl JourneyService {
    pub fn new(store: Arc<dyn PortalStore>) -> Self {
        Self { store }
    }

    /// Journeys of the current organization merged with the caller's
    /// enrollments. Drafts are only visible to content editors.
    pub async fn list(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        query: &JourneyQuery,
    ) -> ServiceResult<Vec<JourneyWithEnrollment>> {
        let journeys = self.store.list_journeys(org.id(), query.status).await?;
        let show_drafts = can_perform(org.role, Permission::EditContent);

        let mut enrollments: HashMap<Uuid, _> = self
            .store
            .list_enrollments(caller)
            .await?
            .into_iter()
            .map(|e| (e.enrollment.journey_id, e.enrollment))
            .collect();

        let merged = journeys
            .into_iter()
            .filter(|j| show_drafts || j.status != JourneyStatus::Draft)
            .map(|j| {
                let enrollment = enrollments.remove(&j.id);
                JourneyWithEnrollment::new(j, enrollment)
            })
            .filter(|j| !query.only_enrolled || j.is_enrolled)
            .collect();

        Ok(merged)
    }

    pub async fn get(
        &self,
        org: &CurrentOrganization,
        caller: Uuid,
        journey_id: Uuid,
    ) -> ServiceResult<JourneyDetail> {
        let show_drafts = can_perform(org.role, Permission::EditContent);
        let journey = self.load(org, journey_id, show_drafts).await?;

        let steps = self.store.list_steps(journey_id).await?;
        let enrollment = self.store.find_enrollment(caller, journey_id).await?;

        Ok(JourneyDetail {
            journey: JourneyWithEnrollment::new(journey, enrollment),
            steps,
        })
    }

    pub async fn create(&self, org: &CurrentOrganization, journey: &NewJourney) -> ServiceResult<Journey> {
        authorize(org.role, Permission::CreateJourneys)?;
        if journey.title.trim().is_empty() {
            return Err(ServiceError::invalid("Journey title is required"));
        }

        let created = self.store.insert_journey(org.id(), journey).await?;
        tracing::info!("Created journey {} in organization {}", created.id, org.id());
        Ok(created)
    }

    pub async fn update(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
        update: &JourneyUpdate,
    ) -> ServiceResult<Journey> {
        authorize(org.role, Permission::EditContent)?;
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::invalid("Journey title cannot be empty"));
        }
        self.load(org, journey_id, true).await?;

        Ok(self.store.update_journey(journey_id, update).await?)
    }

    pub async fn delete(&self, org: &CurrentOrganization, journey_id: Uuid) -> ServiceResult<()> {
        authorize(org.role, Permission::DeleteJourneys)?;
        self.load(org, journey_id, true).await?;

        self.store.delete_journey(journey_id).await?;
        tracing::info!("Deleted journey {}", journey_id);
        Ok(())
    }

    pub async fn publish(&self, org: &CurrentOrganization, journey_id: Uuid) -> ServiceResult<Journey> {
        self.transition(org, journey_id, JourneyStatus::Active).await
    }

    pub async fn archive(&self, org: &CurrentOrganization, journey_id: Uuid) -> ServiceResult<Journey> {
        self.transition(org, journey_id, JourneyStatus::Archived).await
    }

    pub async fn add_step(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
        step: &NewStep,
    ) -> ServiceResult<JourneyStep> {
        authorize(org.role, Permission::EditContent)?;
        if step.title.trim().is_empty() {
            return Err(ServiceError::invalid("Step title is required"));
        }
        if step.points < 0 {
            return Err(ServiceError::invalid("Step points cannot be negative"));
        }
        self.load(org, journey_id, true).await?;

        Ok(self.store.insert_step(journey_id, step).await?)
    }

    pub async fn delete_step(&self, org: &CurrentOrganization, journey_id: Uuid, step_id: Uuid) -> ServiceResult<()> {
        authorize(org.role, Permission::EditContent)?;
        self.load(org, journey_id, true).await?;

        Ok(self.store.delete_step(journey_id, step_id).await?)
    }

    pub async fn update_step(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
        step_id: Uuid,
        update: &StepUpdate,
    ) -> ServiceResult<JourneyStep> {
        authorize(org.role, Permission::EditContent)?;
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::invalid("Step title cannot be empty"));
        }
        if update.points.is_some_and(|p| p < 0) {
            return Err(ServiceError::invalid("Step points cannot be negative"));
        }
        self.load(org, journey_id, true).await?;

        match self.store.update_step(journey_id, step_id, update).await {
            Err(StoreError::NotFound(_)) => Err(ServiceError::not_found("Step not found")),
            other => Ok(other?),
        }
    }

    /// Renumber the journey's steps in the given order. The list must name
    /// every step of the journey exactly once.
    pub async fn reorder_steps(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
        step_order: &[Uuid],
    ) -> ServiceResult<Vec<JourneyStep>> {
        authorize(org.role, Permission::EditContent)?;
        self.load(org, journey_id, true).await?;

        match self.store.reorder_steps(journey_id, step_order).await {
            Err(StoreError::Conflict(_)) => Err(ServiceError::invalid(
                "step_order must list every step of the journey exactly once",
            )),
            other => Ok(other?),
        }
    }

    /// Everyone enrolled in a journey, dropped enrollments included
    pub async fn roster(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
    ) -> ServiceResult<Vec<EnrollmentWithProfile>> {
        authorize(org.role, Permission::ViewAnalytics)?;
        self.load(org, journey_id, true).await?;

        Ok(self.store.list_journey_enrollments(journey_id).await?)
    }

    /// Enroll another member of the organization on their behalf
    pub async fn enroll_user(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<Enrollment> {
        authorize(org.role, Permission::ManageTeam)?;
        self.load(org, journey_id, true).await?;

        let member = self.store.find_member(org.id(), user_id).await?;
        if !member.is_some_and(|m| m.is_active()) {
            return Err(ServiceError::invalid("User is not an active member of this organization"));
        }

        EnrollmentService::new(self.store.clone()).enroll(user_id, journey_id).await
    }

    async fn transition(
        &self,
        org: &CurrentOrganization,
        journey_id: Uuid,
        status: JourneyStatus,
    ) -> ServiceResult<Journey> {
        authorize(org.role, Permission::PublishJourneys)?;
        self.load(org, journey_id, true).await?;

        let journey = self.store.set_journey_status(journey_id, status).await?;
        tracing::info!("Journey {} is now {}", journey_id, status);
        Ok(journey)
    }

    /// Journey of the current organization. Other organizations' journeys
    /// and hidden drafts read as missing.
    async fn load(&self, org: &CurrentOrganization, journey_id: Uuid, show_drafts: bool) -> ServiceResult<Journey> {
        match self.store.get_journey(journey_id).await? {
            Some(j) if j.organization_id == org.id() && (show_drafts || j.status != JourneyStatus::Draft) => Ok(j),
            _ => Err(ServiceError::not_found("Journey not found")),
        }
    }
}
