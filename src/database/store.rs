use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    Badge, EarnedBadge, Enrollment, EnrollmentStatus, EnrollmentWithJourney, EnrollmentWithProfile,
    Journey, JourneyStatus, JourneyStep, JourneyUpdate, MemberWithProfile, MembershipStatus,
    MembershipWithOrganization, NewAuditEntry, NewJourney, NewMember, NewOrganization, NewStep,
    Organization, OrganizationMember, OrganizationUpdate, Profile, ProfileUpdate, StepCompletion,
    StepUpdate,
};
use crate::auth::Role;

/// Errors from a [`PortalStore`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        StoreError::Conflict(what.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of recording a step completion
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub enrollment: Enrollment,
    pub completion: StepCompletion,
    /// `false` when the step had already been completed
    pub newly_completed: bool,
}

/// One enrollment row feeding the leaderboard, with the user's profile data
#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub status: EnrollmentStatus,
    pub points_earned: i32,
    pub badges_count: i64,
}

/// Persistence boundary for the portal. `PgStore` backs production and
/// `MemoryStore` backs development mode and the test suite.
#[async_trait]
pub trait PortalStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // Profiles
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;
    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> StoreResult<Profile>;
    /// Profile for a freshly registered identity; an existing profile is
    /// returned unchanged
    async fn ensure_profile(
        &self,
        user_id: Uuid,
        email: &str,
        full_name: Option<&str>,
    ) -> StoreResult<Profile>;

    // Organizations and memberships
    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Option<Organization>>;
    /// Create an organization with `owner_id` as its active owner, atomically.
    /// A taken slug is a conflict.
    async fn create_organization(
        &self,
        organization: &NewOrganization,
        owner_id: Uuid,
    ) -> StoreResult<MembershipWithOrganization>;
    async fn update_organization(
        &self,
        org_id: Uuid,
        update: &OrganizationUpdate,
    ) -> StoreResult<Organization>;
    /// Active memberships of a user, ordered by `joined_at` then id
    async fn active_memberships(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithOrganization>>;

    // Members
    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithProfile>>;
    async fn get_member(&self, org_id: Uuid, member_id: Uuid) -> StoreResult<Option<OrganizationMember>>;
    async fn find_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<OrganizationMember>>;
    async fn insert_member(&self, member: &NewMember) -> StoreResult<OrganizationMember>;
    async fn update_member_role(&self, member_id: Uuid, role: Role) -> StoreResult<OrganizationMember>;
    async fn update_member_status(
        &self,
        member_id: Uuid,
        status: MembershipStatus,
    ) -> StoreResult<OrganizationMember>;
    async fn delete_member(&self, member_id: Uuid) -> StoreResult<()>;

    // Journeys
    /// Journeys of one organization, newest first
    async fn list_journeys(
        &self,
        org_id: Uuid,
        status: Option<JourneyStatus>,
    ) -> StoreResult<Vec<Journey>>;
    async fn get_journey(&self, journey_id: Uuid) -> StoreResult<Option<Journey>>;
    async fn insert_journey(&self, org_id: Uuid, journey: &NewJourney) -> StoreResult<Journey>;
    async fn update_journey(&self, journey_id: Uuid, update: &JourneyUpdate) -> StoreResult<Journey>;
    async fn set_journey_status(&self, journey_id: Uuid, status: JourneyStatus) -> StoreResult<Journey>;
    async fn delete_journey(&self, journey_id: Uuid) -> StoreResult<()>;
    /// Steps of a journey in display order
    async fn list_steps(&self, journey_id: Uuid) -> StoreResult<Vec<JourneyStep>>;
    /// Step mutations recount the journey totals and the counters of its
    /// live enrollments in the same operation
    async fn insert_step(&self, journey_id: Uuid, step: &NewStep) -> StoreResult<JourneyStep>;
    async fn update_step(
        &self,
        journey_id: Uuid,
        step_id: Uuid,
        update: &StepUpdate,
    ) -> StoreResult<JourneyStep>;
    async fn delete_step(&self, journey_id: Uuid, step_id: Uuid) -> StoreResult<()>;
    /// Renumber steps 1..=n following `step_order`, which must list every
    /// step of the journey exactly once
    async fn reorder_steps(&self, journey_id: Uuid, step_order: &[Uuid]) -> StoreResult<Vec<JourneyStep>>;

    // Enrollments
    /// A user's enrollments joined with their journeys, newest first
    async fn list_enrollments(&self, user_id: Uuid) -> StoreResult<Vec<EnrollmentWithJourney>>;
    /// Every enrollment of one journey with the learner's profile, oldest first
    async fn list_journey_enrollments(&self, journey_id: Uuid) -> StoreResult<Vec<EnrollmentWithProfile>>;
    async fn get_enrollment(&self, enrollment_id: Uuid) -> StoreResult<Option<Enrollment>>;
    async fn find_enrollment(&self, user_id: Uuid, journey_id: Uuid) -> StoreResult<Option<Enrollment>>;
    async fn insert_enrollment(
        &self,
        user_id: Uuid,
        journey_id: Uuid,
        total_steps: i32,
    ) -> StoreResult<Enrollment>;
    /// Bring a dropped enrollment back. Status and counters are recomputed
    /// from the completions it kept, so a learner who had finished every
    /// required step comes back as completed.
    async fn reactivate_enrollment(&self, enrollment_id: Uuid) -> StoreResult<Enrollment>;
    async fn set_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> StoreResult<Enrollment>;
    async fn list_completions(&self, enrollment_id: Uuid) -> StoreResult<Vec<StepCompletion>>;
    /// Record a step completion and recompute the enrollment counters from
    /// the completion set, atomically. Completing a step twice returns the
    /// existing completion.
    async fn complete_step(
        &self,
        enrollment_id: Uuid,
        step_id: Uuid,
        submission_data: Option<Value>,
    ) -> StoreResult<CompletionOutcome>;

    // Gamification
    async fn list_badges(&self) -> StoreResult<Vec<Badge>>;
    async fn list_user_badges(&self, user_id: Uuid) -> StoreResult<Vec<EarnedBadge>>;
    /// Grant a badge; returns `false` if the user already held it
    async fn award_badge(&self, user_id: Uuid, badge_id: Uuid) -> StoreResult<bool>;
    /// Enrollment rows for every journey of an organization
    async fn leaderboard_rows(&self, org_id: Uuid) -> StoreResult<Vec<LeaderboardRow>>;

    // Audit
    async fn record_audit(&self, entry: &NewAuditEntry) -> StoreResult<()>;
}
