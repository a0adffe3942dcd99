//! In-process [`PortalStore`] used for `OASIS_STORE=memory` and the tests.
//!
//! Every operation takes the single table lock for its whole duration, which
//! gives the same all-or-nothing behavior as a Postgres transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    AccountStatus, AuditEntry, Badge, EarnedBadge, Enrollment, EnrollmentStatus,
    EnrollmentWithJourney, EnrollmentWithProfile, Journey, JourneyStatus, JourneyStep,
    JourneyUpdate, MemberWithProfile, MembershipStatus, MembershipWithOrganization,
    NewAuditEntry, NewJourney, NewMember, NewOrganization, NewStep, Organization,
    OrganizationMember, OrganizationType, OrganizationUpdate, Profile, ProfileSummary,
    ProfileUpdate, StepCompletion, StepType, StepUpdate,
};
use super::store::{CompletionOutcome, LeaderboardRow, PortalStore, StoreError, StoreResult};
use crate::auth::Role;

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    organizations: HashMap<Uuid, Organization>,
    members: Vec<OrganizationMember>,
    journeys: HashMap<Uuid, Journey>,
    steps: Vec<JourneyStep>,
    enrollments: HashMap<Uuid, Enrollment>,
    completions: Vec<StepCompletion>,
    badges: Vec<Badge>,
    user_badges: Vec<(Uuid, Uuid, DateTime<Utc>)>,
    audit_logs: Vec<AuditEntry>,
}

impl Tables {
    fn steps_of(&self, journey_id: Uuid) -> Vec<JourneyStep> {
        let mut steps: Vec<JourneyStep> =
            self.steps.iter().filter(|s| s.journey_id == journey_id).cloned().collect();
        steps.sort_by_key(|s| (s.order, s.created_at));
        steps
    }

    fn completions_of(&self, enrollment_id: Uuid) -> Vec<StepCompletion> {
        let mut completions: Vec<StepCompletion> = self
            .completions
            .iter()
            .filter(|c| c.enrollment_id == enrollment_id)
            .cloned()
            .collect();
        completions.sort_by_key(|c| c.completed_at);
        completions
    }

    fn recount_journey(&mut self, journey_id: Uuid) {
        let steps = self.steps_of(journey_id);
        if let Some(journey) = self.journeys.get_mut(&journey_id) {
            journey.recount(&steps);
            journey.updated_at = Utc::now();
        }
        self.recount_enrollments(journey_id, &steps);
    }

    /// Re-derive the counters of every live enrollment in a journey after its
    /// step list changed. Dropped enrollments are left alone until they
    /// come back.
    fn recount_enrollments(&mut self, journey_id: Uuid, steps: &[JourneyStep]) {
        let now = Utc::now();
        let ids: Vec<Uuid> = self
            .enrollments
            .values()
            .filter(|e| e.journey_id == journey_id && !e.is_dropped())
            .map(|e| e.id)
            .collect();
        for id in ids {
            let completions = self.completions_of(id);
            if let Some(enrollment) = self.enrollments.get_mut(&id) {
                enrollment.apply_completions(steps, &completions, now);
            }
        }
    }

    fn member_mut(&mut self, member_id: Uuid) -> StoreResult<&mut OrganizationMember> {
        self.members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| StoreError::not_found("Member"))
    }

    fn journey_mut(&mut self, journey_id: Uuid) -> StoreResult<&mut Journey> {
        self.journeys.get_mut(&journey_id).ok_or_else(|| StoreError::not_found("Journey"))
    }

    fn enrollment_mut(&mut self, enrollment_id: Uuid) -> StoreResult<&mut Enrollment> {
        self.enrollments
            .get_mut(&enrollment_id)
            .ok_or_else(|| StoreError::not_found("Enrollment"))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.tables.write().await.profiles.insert(profile.id, profile);
    }

    pub async fn insert_organization(&self, organization: Organization) {
        self.tables.write().await.organizations.insert(organization.id, organization);
    }

    pub async fn insert_badge(&self, badge: Badge) {
        self.tables.write().await.badges.push(badge);
    }

    /// Audit trail recorded so far, oldest first
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.tables.read().await.audit_logs.clone()
    }

    /// Create an active profile with sensible defaults
    pub async fn seed_profile(&self, email: &str, full_name: &str, is_platform_admin: bool) -> Profile {
        let profile = new_profile(Uuid::new_v4(), email, full_name, is_platform_admin);
        self.insert_profile(profile.clone()).await;
        profile
    }

    pub async fn seed_organization(&self, name: &str, slug: &str) -> Organization {
        let organization = new_organization(Uuid::new_v4(), name, slug, json!({}));
        self.insert_organization(organization.clone()).await;
        organization
    }

    /// Store pre-populated with a small demo tenant. Ids are fixed so
    /// development tokens stay valid across restarts.
    pub fn demo() -> Self {
        let mut tables = Tables::default();
        let now = Utc::now();

        let org = new_organization(
            demo::ORGANIZATION,
            "Fundación OASIS",
            "fundacion-oasis",
            json!({ "features": ["crm", "chat", "analytics"] }),
        );
        tables.organizations.insert(org.id, org.clone());

        let people = [
            (demo::OWNER, "ana.perez@oasis.cl", "Ana Pérez", Role::Owner, false),
            (demo::ADMIN, "carlos.soto@oasis.cl", "Carlos Soto", Role::Admin, false),
            (demo::FACILITADOR, "valentina.rojas@oasis.cl", "Valentina Rojas", Role::Facilitador, false),
            (demo::PARTICIPANTE, "diego.munoz@oasis.cl", "Diego Muñoz", Role::Participante, false),
            (demo::PLATFORM_ADMIN, "staff@oasis.cl", "Equipo OASIS", Role::Participante, true),
        ];
        for (offset, (id, email, name, role, is_platform_admin)) in people.into_iter().enumerate() {
            tables.profiles.insert(id, new_profile(id, email, name, is_platform_admin));
            if is_platform_admin {
                continue;
            }
            tables.members.push(OrganizationMember {
                id: Uuid::new_v4(),
                organization_id: org.id,
                user_id: id,
                role,
                status: MembershipStatus::Active,
                invited_by: None,
                joined_at: now - Duration::days(30 - offset as i64),
            });
        }

        let mut journey = Journey {
            id: demo::JOURNEY,
            organization_id: org.id,
            title: "Liderazgo Joven".to_string(),
            description: Some("Descubre tu estilo de liderazgo en cuatro pasos".to_string()),
            cover_image_url: None,
            status: JourneyStatus::Active,
            settings: json!({ "allowSelfEnrollment": true }),
            total_steps: 0,
            total_points: 0,
            created_at: now,
            updated_at: now,
        };
        let steps = [
            ("Bienvenida", StepType::Content, 10, true),
            ("Autodiagnóstico", StepType::Quiz, 30, true),
            ("Proyecto comunitario", StepType::Task, 50, true),
            ("Charla inspiradora", StepType::Video, 10, false),
        ];
        for (index, (title, step_type, points, is_required)) in steps.into_iter().enumerate() {
            tables.steps.push(JourneyStep {
                id: Uuid::new_v4(),
                journey_id: journey.id,
                title: title.to_string(),
                description: None,
                step_type,
                order: index as i32 + 1,
                points,
                content: json!({}),
                is_required,
                created_at: now,
                updated_at: now,
            });
        }
        journey.recount(&tables.steps);
        tables.journeys.insert(journey.id, journey);

        let badges = [
            ("Primeros pasos", "Completa tu primer paso", "progreso", Some(10)),
            ("Constante", "Alcanza 100 puntos", "progreso", Some(100)),
            ("Líder", "Alcanza 600 puntos", "logro", Some(600)),
        ];
        for (name, description, category, points_required) in badges {
            tables.badges.push(Badge {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: description.to_string(),
                icon_url: format!("/badges/{}.svg", name.to_lowercase().replace(' ', "-")),
                category: category.to_string(),
                points_required,
            });
        }

        Self { tables: RwLock::new(tables) }
    }
}

/// Fixed identifiers of the demo dataset
pub mod demo {
    use uuid::Uuid;

    pub const ORGANIZATION: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0001);
    pub const OWNER: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0101);
    pub const ADMIN: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0102);
    pub const FACILITADOR: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0103);
    pub const PARTICIPANTE: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0104);
    pub const PLATFORM_ADMIN: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0199);
    pub const JOURNEY: Uuid = Uuid::from_u128(0x0a51_0000_0000_4000_8000_0000_0000_0201);
}

fn new_profile(id: Uuid, email: &str, full_name: &str, is_platform_admin: bool) -> Profile {
    let now = Utc::now();
    Profile {
        id,
        email: email.to_string(),
        full_name: Some(full_name.to_string()),
        avatar_url: None,
        is_platform_admin,
        status: AccountStatus::Active,
        metadata: json!({}),
        created_at: now,
        updated_at: now,
    }
}

fn new_organization(id: Uuid, name: &str, slug: &str, settings: Value) -> Organization {
    let now = Utc::now();
    Organization {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
        description: None,
        logo_url: None,
        org_type: OrganizationType::Community,
        settings,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("Profile"))?;
        update.apply(profile);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn ensure_profile(
        &self,
        user_id: Uuid,
        email: &str,
        full_name: Option<&str>,
    ) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.profiles.get(&user_id) {
            return Ok(existing.clone());
        }
        if tables.profiles.values().any(|p| p.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::conflict("Email is already registered"));
        }

        let mut profile = new_profile(user_id, email, "", false);
        profile.full_name = full_name.map(str::to_string);
        tables.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.tables.read().await.organizations.get(&org_id).cloned())
    }

    async fn create_organization(
        &self,
        organization: &NewOrganization,
        owner_id: Uuid,
    ) -> StoreResult<MembershipWithOrganization> {
        let mut tables = self.tables.write().await;
        if tables.organizations.values().any(|o| o.slug == organization.slug) {
            return Err(StoreError::conflict("Organization slug is already taken"));
        }
        if !tables.profiles.contains_key(&owner_id) {
            return Err(StoreError::not_found("Profile"));
        }

        let mut row = new_organization(
            Uuid::new_v4(),
            &organization.name,
            &organization.slug,
            organization.settings.clone(),
        );
        row.description = organization.description.clone();
        row.org_type = organization.org_type;

        let membership = OrganizationMember {
            id: Uuid::new_v4(),
            organization_id: row.id,
            user_id: owner_id,
            role: Role::Owner,
            status: MembershipStatus::Active,
            invited_by: None,
            joined_at: row.created_at,
        };
        tables.organizations.insert(row.id, row.clone());
        tables.members.push(membership.clone());
        Ok(MembershipWithOrganization { organization: row, membership })
    }

    async fn update_organization(
        &self,
        org_id: Uuid,
        update: &OrganizationUpdate,
    ) -> StoreResult<Organization> {
        let mut tables = self.tables.write().await;
        let organization = tables
            .organizations
            .get_mut(&org_id)
            .ok_or_else(|| StoreError::not_found("Organization"))?;
        update.apply(organization);
        organization.updated_at = Utc::now();
        Ok(organization.clone())
    }

    async fn active_memberships(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithOrganization>> {
        let tables = self.tables.read().await;
        let mut memberships: Vec<MembershipWithOrganization> = tables
            .members
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active())
            .filter_map(|m| {
                tables.organizations.get(&m.organization_id).map(|org| MembershipWithOrganization {
                    organization: org.clone(),
                    membership: m.clone(),
                })
            })
            .collect();
        memberships.sort_by_key(|m| (m.membership.joined_at, m.membership.id));
        Ok(memberships)
    }

    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithProfile>> {
        let tables = self.tables.read().await;
        let mut members: Vec<MemberWithProfile> = tables
            .members
            .iter()
            .filter(|m| m.organization_id == org_id)
            .filter_map(|m| {
                tables.profiles.get(&m.user_id).map(|p| MemberWithProfile {
                    member: m.clone(),
                    profile: ProfileSummary::from(p),
                })
            })
            .collect();
        members.sort_by(|a, b| {
            b.member
                .role
                .rank()
                .cmp(&a.member.role.rank())
                .then(a.member.joined_at.cmp(&b.member.joined_at))
        });
        Ok(members)
    }

    async fn get_member(&self, org_id: Uuid, member_id: Uuid) -> StoreResult<Option<OrganizationMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .find(|m| m.id == member_id && m.organization_id == org_id)
            .cloned())
    }

    async fn find_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<OrganizationMember>> {
        let tables = self.tables.read().await;
        Ok(tables
            .members
            .iter()
            .find(|m| m.user_id == user_id && m.organization_id == org_id)
            .cloned())
    }

    async fn insert_member(&self, member: &NewMember) -> StoreResult<OrganizationMember> {
        let mut tables = self.tables.write().await;
        if tables
            .members
            .iter()
            .any(|m| m.organization_id == member.organization_id && m.user_id == member.user_id)
        {
            return Err(StoreError::conflict("User is already a member of the organization"));
        }

        let row = OrganizationMember {
            id: Uuid::new_v4(),
            organization_id: member.organization_id,
            user_id: member.user_id,
            role: member.role,
            status: member.status,
            invited_by: member.invited_by,
            joined_at: Utc::now(),
        };
        tables.members.push(row.clone());
        Ok(row)
    }

    async fn update_member_role(&self, member_id: Uuid, role: Role) -> StoreResult<OrganizationMember> {
        let mut tables = self.tables.write().await;
        let member = tables.member_mut(member_id)?;
        member.role = role;
        Ok(member.clone())
    }

    async fn update_member_status(
        &self,
        member_id: Uuid,
        status: MembershipStatus,
    ) -> StoreResult<OrganizationMember> {
        let mut tables = self.tables.write().await;
        let member = tables.member_mut(member_id)?;
        member.status = status;
        Ok(member.clone())
    }

    async fn delete_member(&self, member_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.members.len();
        tables.members.retain(|m| m.id != member_id);
        if tables.members.len() == before {
            return Err(StoreError::not_found("Member"));
        }
        Ok(())
    }

    async fn list_journeys(
        &self,
        org_id: Uuid,
        status: Option<JourneyStatus>,
    ) -> StoreResult<Vec<Journey>> {
        let tables = self.tables.read().await;
        let mut journeys: Vec<Journey> = tables
            .journeys
            .values()
            .filter(|j| j.organization_id == org_id)
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();
        journeys.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(journeys)
    }

    async fn get_journey(&self, journey_id: Uuid) -> StoreResult<Option<Journey>> {
        Ok(self.tables.read().await.journeys.get(&journey_id).cloned())
    }

    async fn insert_journey(&self, org_id: Uuid, journey: &NewJourney) -> StoreResult<Journey> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&org_id) {
            return Err(StoreError::not_found("Organization"));
        }

        let now = Utc::now();
        let row = Journey {
            id: Uuid::new_v4(),
            organization_id: org_id,
            title: journey.title.clone(),
            description: journey.description.clone(),
            cover_image_url: journey.cover_image_url.clone(),
            status: JourneyStatus::Draft,
            settings: journey.settings.clone(),
            total_steps: 0,
            total_points: 0,
            created_at: now,
            updated_at: now,
        };
        tables.journeys.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_journey(&self, journey_id: Uuid, update: &JourneyUpdate) -> StoreResult<Journey> {
        let mut tables = self.tables.write().await;
        let journey = tables.journey_mut(journey_id)?;
        update.apply(journey);
        journey.updated_at = Utc::now();
        Ok(journey.clone())
    }

    async fn set_journey_status(&self, journey_id: Uuid, status: JourneyStatus) -> StoreResult<Journey> {
        let mut tables = self.tables.write().await;
        let journey = tables.journey_mut(journey_id)?;
        journey.status = status;
        journey.updated_at = Utc::now();
        Ok(journey.clone())
    }

    async fn delete_journey(&self, journey_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.journeys.remove(&journey_id).is_none() {
            return Err(StoreError::not_found("Journey"));
        }

        let enrollment_ids: Vec<Uuid> = tables
            .enrollments
            .values()
            .filter(|e| e.journey_id == journey_id)
            .map(|e| e.id)
            .collect();
        tables.completions.retain(|c| !enrollment_ids.contains(&c.enrollment_id));
        tables.enrollments.retain(|_, e| e.journey_id != journey_id);
        tables.steps.retain(|s| s.journey_id != journey_id);
        Ok(())
    }

    async fn list_steps(&self, journey_id: Uuid) -> StoreResult<Vec<JourneyStep>> {
        Ok(self.tables.read().await.steps_of(journey_id))
    }

    async fn insert_step(&self, journey_id: Uuid, step: &NewStep) -> StoreResult<JourneyStep> {
        let mut tables = self.tables.write().await;
        if !tables.journeys.contains_key(&journey_id) {
            return Err(StoreError::not_found("Journey"));
        }

        let order = step.order.unwrap_or_else(|| {
            tables
                .steps
                .iter()
                .filter(|s| s.journey_id == journey_id)
                .map(|s| s.order)
                .max()
                .unwrap_or(0)
                + 1
        });
        let now = Utc::now();
        let row = JourneyStep {
            id: Uuid::new_v4(),
            journey_id,
            title: step.title.clone(),
            description: step.description.clone(),
            step_type: step.step_type,
            order,
            points: step.points,
            content: step.content.clone(),
            is_required: step.is_required,
            created_at: now,
            updated_at: now,
        };
        tables.steps.push(row.clone());
        tables.recount_journey(journey_id);
        Ok(row)
    }

    async fn delete_step(&self, journey_id: Uuid, step_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.steps.len();
        tables.steps.retain(|s| !(s.id == step_id && s.journey_id == journey_id));
        if tables.steps.len() == before {
            return Err(StoreError::not_found("Step"));
        }
        tables.completions.retain(|c| c.step_id != step_id);
        tables.recount_journey(journey_id);
        Ok(())
    }

    async fn update_step(
        &self,
        journey_id: Uuid,
        step_id: Uuid,
        update: &StepUpdate,
    ) -> StoreResult<JourneyStep> {
        let mut tables = self.tables.write().await;
        let step = tables
            .steps
            .iter_mut()
            .find(|s| s.id == step_id && s.journey_id == journey_id)
            .ok_or_else(|| StoreError::not_found("Step"))?;
        update.apply(step);
        step.updated_at = Utc::now();
        let row = step.clone();

        if update.changes_totals() {
            tables.recount_journey(journey_id);
        }
        Ok(row)
    }

    async fn reorder_steps(&self, journey_id: Uuid, step_order: &[Uuid]) -> StoreResult<Vec<JourneyStep>> {
        let mut tables = self.tables.write().await;
        if !tables.journeys.contains_key(&journey_id) {
            return Err(StoreError::not_found("Journey"));
        }
        let current = tables.steps_of(journey_id);
        if !same_steps(&current, step_order) {
            return Err(StoreError::conflict("Step order must list every step exactly once"));
        }

        let now = Utc::now();
        for (index, id) in step_order.iter().enumerate() {
            if let Some(step) = tables.steps.iter_mut().find(|s| s.id == *id) {
                step.order = index as i32 + 1;
                step.updated_at = now;
            }
        }
        Ok(tables.steps_of(journey_id))
    }

    async fn list_enrollments(&self, user_id: Uuid) -> StoreResult<Vec<EnrollmentWithJourney>> {
        let tables = self.tables.read().await;
        let mut enrollments: Vec<EnrollmentWithJourney> = tables
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| {
                tables.journeys.get(&e.journey_id).map(|j| EnrollmentWithJourney {
                    enrollment: e.clone(),
                    journey: j.clone(),
                })
            })
            .collect();
        enrollments.sort_by(|a, b| b.enrollment.enrolled_at.cmp(&a.enrollment.enrolled_at));
        Ok(enrollments)
    }

    async fn list_journey_enrollments(&self, journey_id: Uuid) -> StoreResult<Vec<EnrollmentWithProfile>> {
        let tables = self.tables.read().await;
        let mut roster: Vec<EnrollmentWithProfile> = tables
            .enrollments
            .values()
            .filter(|e| e.journey_id == journey_id)
            .filter_map(|e| {
                tables.profiles.get(&e.user_id).map(|p| EnrollmentWithProfile {
                    enrollment: e.clone(),
                    user: ProfileSummary::from(p),
                })
            })
            .collect();
        roster.sort_by(|a, b| {
            a.enrollment
                .enrolled_at
                .cmp(&b.enrollment.enrolled_at)
                .then(a.enrollment.id.cmp(&b.enrollment.id))
        });
        Ok(roster)
    }

    async fn get_enrollment(&self, enrollment_id: Uuid) -> StoreResult<Option<Enrollment>> {
        Ok(self.tables.read().await.enrollments.get(&enrollment_id).cloned())
    }

    async fn find_enrollment(&self, user_id: Uuid, journey_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .values()
            .find(|e| e.user_id == user_id && e.journey_id == journey_id)
            .cloned())
    }

    async fn insert_enrollment(
        &self,
        user_id: Uuid,
        journey_id: Uuid,
        total_steps: i32,
    ) -> StoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        if tables
            .enrollments
            .values()
            .any(|e| e.user_id == user_id && e.journey_id == journey_id)
        {
            return Err(StoreError::conflict("Already enrolled in this journey"));
        }

        let row = Enrollment {
            id: Uuid::new_v4(),
            journey_id,
            user_id,
            status: EnrollmentStatus::Enrolled,
            progress: 0,
            completed_steps: 0,
            total_steps,
            points_earned: 0,
            enrolled_at: Utc::now(),
            completed_at: None,
        };
        tables.enrollments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn reactivate_enrollment(&self, enrollment_id: Uuid) -> StoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        let journey_id = tables.enrollment_mut(enrollment_id)?.journey_id;
        let steps = tables.steps_of(journey_id);
        let completions = tables.completions_of(enrollment_id);

        let now = Utc::now();
        let enrollment = tables.enrollment_mut(enrollment_id)?;
        enrollment.apply_completions(&steps, &completions, now);
        enrollment.enrolled_at = now;
        Ok(enrollment.clone())
    }

    async fn set_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> StoreResult<Enrollment> {
        let mut tables = self.tables.write().await;
        let enrollment = tables.enrollment_mut(enrollment_id)?;
        enrollment.status = status;
        Ok(enrollment.clone())
    }

    async fn list_completions(&self, enrollment_id: Uuid) -> StoreResult<Vec<StepCompletion>> {
        Ok(self.tables.read().await.completions_of(enrollment_id))
    }

    async fn complete_step(
        &self,
        enrollment_id: Uuid,
        step_id: Uuid,
        submission_data: Option<Value>,
    ) -> StoreResult<CompletionOutcome> {
        let mut tables = self.tables.write().await;

        let enrollment = tables
            .enrollments
            .get(&enrollment_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Enrollment"))?;
        if enrollment.is_dropped() {
            return Err(StoreError::conflict("Enrollment has been dropped"));
        }

        let steps = tables.steps_of(enrollment.journey_id);
        let step = steps
            .iter()
            .find(|s| s.id == step_id)
            .ok_or_else(|| StoreError::not_found("Step"))?;

        if let Some(existing) = tables
            .completions
            .iter()
            .find(|c| c.enrollment_id == enrollment_id && c.step_id == step_id)
        {
            return Ok(CompletionOutcome {
                enrollment,
                completion: existing.clone(),
                newly_completed: false,
            });
        }

        let now = Utc::now();
        let completion = StepCompletion {
            id: Uuid::new_v4(),
            enrollment_id,
            step_id,
            completed_at: now,
            points_awarded: step.points,
            submission_data,
        };
        tables.completions.push(completion.clone());

        let completions = tables.completions_of(enrollment_id);
        let enrollment = tables.enrollment_mut(enrollment_id)?;
        enrollment.apply_completions(&steps, &completions, now);

        Ok(CompletionOutcome {
            enrollment: enrollment.clone(),
            completion,
            newly_completed: true,
        })
    }

    async fn list_badges(&self) -> StoreResult<Vec<Badge>> {
        let mut badges = self.tables.read().await.badges.clone();
        badges.sort_by_key(|b| (b.points_required, b.name.clone()));
        Ok(badges)
    }

    async fn list_user_badges(&self, user_id: Uuid) -> StoreResult<Vec<EarnedBadge>> {
        let tables = self.tables.read().await;
        let mut earned: Vec<EarnedBadge> = tables
            .user_badges
            .iter()
            .filter(|(user, _, _)| *user == user_id)
            .filter_map(|(_, badge_id, earned_at)| {
                tables.badges.iter().find(|b| b.id == *badge_id).map(|badge| EarnedBadge {
                    badge: badge.clone(),
                    earned_at: *earned_at,
                })
            })
            .collect();
        earned.sort_by_key(|b| b.earned_at);
        Ok(earned)
    }

    async fn award_badge(&self, user_id: Uuid, badge_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.badges.iter().any(|b| b.id == badge_id) {
            return Err(StoreError::not_found("Badge"));
        }
        if tables.user_badges.iter().any(|(u, b, _)| *u == user_id && *b == badge_id) {
            return Ok(false);
        }
        tables.user_badges.push((user_id, badge_id, Utc::now()));
        Ok(true)
    }

    async fn leaderboard_rows(&self, org_id: Uuid) -> StoreResult<Vec<LeaderboardRow>> {
        let tables = self.tables.read().await;
        let rows = tables
            .enrollments
            .values()
            .filter(|e| {
                tables
                    .journeys
                    .get(&e.journey_id)
                    .map_or(false, |j| j.organization_id == org_id)
            })
            .map(|e| {
                let profile = tables.profiles.get(&e.user_id);
                LeaderboardRow {
                    user_id: e.user_id,
                    full_name: profile.and_then(|p| p.full_name.clone()),
                    avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                    status: e.status,
                    points_earned: e.points_earned,
                    badges_count: tables.user_badges.iter().filter(|(u, _, _)| *u == e.user_id).count() as i64,
                }
            })
            .collect();
        Ok(rows)
    }

    async fn record_audit(&self, entry: &NewAuditEntry) -> StoreResult<()> {
        self.tables.write().await.audit_logs.push(AuditEntry {
            id: Uuid::new_v4(),
            entry: entry.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

/// Whether `order` names exactly the given steps, each once
fn same_steps(steps: &[JourneyStep], order: &[Uuid]) -> bool {
    let mut expected: Vec<Uuid> = steps.iter().map(|s| s.id).collect();
    let mut given = order.to_vec();
    expected.sort();
    given.sort();
    expected == given
}
