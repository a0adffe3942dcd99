//! Postgres-backed [`PortalStore`] over the tables in `migrations/`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use super::manager::DatabaseManager;
use super::models::{
    decode_text, Badge, EarnedBadge, Enrollment, EnrollmentStatus, EnrollmentWithJourney,
    EnrollmentWithProfile, Journey, JourneyStatus, JourneyStep, JourneyUpdate, MemberWithProfile,
    MembershipStatus, MembershipWithOrganization, NewAuditEntry, NewJourney, NewMember,
    NewOrganization, NewStep, Organization, OrganizationMember, OrganizationUpdate, Profile,
    ProfileSummary, ProfileUpdate, StepCompletion, StepUpdate,
};
use super::store::{CompletionOutcome, LeaderboardRow, PortalStore, StoreError, StoreResult};
use crate::auth::Role;

type PgTx<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

/// Orders members by role rank, highest first
const ROLE_RANK_SQL: &str = "CASE m.role WHEN 'owner' THEN 4 WHEN 'admin' THEN 3 \
                             WHEN 'facilitador' THEN 2 ELSE 1 END";

pub struct PgStore {
    db: DatabaseManager,
}

impl PgStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}

/// Translate constraint violations into domain errors
fn constraint_error(err: sqlx::Error, conflict: &str, missing: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::conflict(conflict);
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::not_found(missing);
        }
    }
    StoreError::Sqlx(err)
}

fn required<T>(value: Option<T>, what: &str) -> StoreResult<T> {
    value.ok_or_else(|| StoreError::not_found(what))
}

#[async_trait]
impl PortalStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.db
            .health_check()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(profile)
    }

    async fn find_profile_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(profile)
    }

    async fn update_profile(&self, user_id: Uuid, update: &ProfileUpdate) -> StoreResult<Profile> {
        let query = r#"
            UPDATE profiles
            SET full_name = COALESCE($2, full_name),
                avatar_url = COALESCE($3, avatar_url),
                updated_at = now()
            WHERE id = $1
            RETURNING *
        "#;

        let profile = sqlx::query_as::<_, Profile>(query)
            .bind(user_id)
            .bind(&update.full_name)
            .bind(&update.avatar_url)
            .fetch_optional(self.pool())
            .await?;
        required(profile, "Profile")
    }

    async fn ensure_profile(
        &self,
        user_id: Uuid,
        email: &str,
        full_name: Option<&str>,
    ) -> StoreResult<Profile> {
        let inserted = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (id, email, full_name) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING RETURNING *",
        )
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| constraint_error(e, "Email is already registered", "Profile"))?;

        match inserted {
            Some(profile) => Ok(profile),
            None => required(self.get_profile(user_id).await?, "Profile"),
        }
    }

    async fn get_organization(&self, org_id: Uuid) -> StoreResult<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(org_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(organization)
    }

    async fn create_organization(
        &self,
        organization: &NewOrganization,
        owner_id: Uuid,
    ) -> StoreResult<MembershipWithOrganization> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug, description, type, settings)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&organization.name)
        .bind(&organization.slug)
        .bind(&organization.description)
        .bind(organization.org_type.as_str())
        .bind(&organization.settings)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "Organization slug is already taken", "Organization"))?;

        let membership = sqlx::query_as::<_, OrganizationMember>(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role, status)
            VALUES ($1, $2, 'owner', 'active')
            RETURNING *
            "#,
        )
        .bind(row.id)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| constraint_error(e, "User is already a member of the organization", "Profile"))?;

        tx.commit().await?;
        Ok(MembershipWithOrganization { organization: row, membership })
    }

    async fn update_organization(
        &self,
        org_id: Uuid,
        update: &OrganizationUpdate,
    ) -> StoreResult<Organization> {
        let query = r#"
            UPDATE organizations
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                logo_url = COALESCE($4, logo_url),
                settings = COALESCE($5, settings),
                updated_at = now()
            WHERE id = $1
            RETURNING *
        "#;

        let organization = sqlx::query_as::<_, Organization>(query)
            .bind(org_id)
            .bind(&update.name)
            .bind(&update.description)
            .bind(&update.logo_url)
            .bind(&update.settings)
            .fetch_optional(self.pool())
            .await?;
        required(organization, "Organization")
    }

    async fn active_memberships(&self, user_id: Uuid) -> StoreResult<Vec<MembershipWithOrganization>> {
        let members = sqlx::query_as::<_, OrganizationMember>(
            "SELECT * FROM organization_members WHERE user_id = $1 AND status = 'active' \
             ORDER BY joined_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let org_ids: Vec<Uuid> = members.iter().map(|m| m.organization_id).collect();
        let organizations: HashMap<Uuid, Organization> =
            sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = ANY($1)")
                .bind(&org_ids)
                .fetch_all(self.pool())
                .await?
                .into_iter()
                .map(|org| (org.id, org))
                .collect();

        Ok(members
            .into_iter()
            .filter_map(|membership| {
                organizations
                    .get(&membership.organization_id)
                    .cloned()
                    .map(|organization| MembershipWithOrganization { organization, membership })
            })
            .collect())
    }

    async fn list_members(&self, org_id: Uuid) -> StoreResult<Vec<MemberWithProfile>> {
        let query = format!(
            r#"
            SELECT m.*, p.email AS profile_email, p.full_name AS profile_full_name,
                   p.avatar_url AS profile_avatar_url
            FROM organization_members m
            JOIN profiles p ON p.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY {} DESC, m.joined_at
            "#,
            ROLE_RANK_SQL
        );

        let rows = sqlx::query(&query).bind(org_id).fetch_all(self.pool()).await?;
        rows.iter()
            .map(|row| -> StoreResult<MemberWithProfile> {
                let member = OrganizationMember::from_row(row)?;
                let profile = ProfileSummary {
                    id: member.user_id,
                    email: row.try_get("profile_email")?,
                    full_name: row.try_get("profile_full_name")?,
                    avatar_url: row.try_get("profile_avatar_url")?,
                };
                Ok(MemberWithProfile { member, profile })
            })
            .collect()
    }

    async fn get_member(&self, org_id: Uuid, member_id: Uuid) -> StoreResult<Option<OrganizationMember>> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            "SELECT * FROM organization_members WHERE id = $1 AND organization_id = $2",
        )
        .bind(member_id)
        .bind(org_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(member)
    }

    async fn find_member(&self, org_id: Uuid, user_id: Uuid) -> StoreResult<Option<OrganizationMember>> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            "SELECT * FROM organization_members WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(member)
    }

    async fn insert_member(&self, member: &NewMember) -> StoreResult<OrganizationMember> {
        let query = r#"
            INSERT INTO organization_members (organization_id, user_id, role, status, invited_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        "#;

        sqlx::query_as::<_, OrganizationMember>(query)
            .bind(member.organization_id)
            .bind(member.user_id)
            .bind(member.role.as_str())
            .bind(member.status.as_str())
            .bind(member.invited_by)
            .fetch_one(self.pool())
            .await
            .map_err(|e| {
                constraint_error(e, "User is already a member of the organization", "Organization or user")
            })
    }

    async fn update_member_role(&self, member_id: Uuid, role: Role) -> StoreResult<OrganizationMember> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            "UPDATE organization_members SET role = $2 WHERE id = $1 RETURNING *",
        )
        .bind(member_id)
        .bind(role.as_str())
        .fetch_optional(self.pool())
        .await?;
        required(member, "Member")
    }

    async fn update_member_status(
        &self,
        member_id: Uuid,
        status: MembershipStatus,
    ) -> StoreResult<OrganizationMember> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            "UPDATE organization_members SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(member_id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;
        required(member, "Member")
    }

    async fn delete_member(&self, member_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM organization_members WHERE id = $1")
            .bind(member_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Member"));
        }
        Ok(())
    }

    async fn list_journeys(
        &self,
        org_id: Uuid,
        status: Option<JourneyStatus>,
    ) -> StoreResult<Vec<Journey>> {
        let query = r#"
            SELECT * FROM journeys
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id
        "#;

        let journeys = sqlx::query_as::<_, Journey>(query)
            .bind(org_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(self.pool())
            .await?;
        Ok(journeys)
    }

    async fn get_journey(&self, journey_id: Uuid) -> StoreResult<Option<Journey>> {
        let journey = sqlx::query_as::<_, Journey>("SELECT * FROM journeys WHERE id = $1")
            .bind(journey_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(journey)
    }

    async fn insert_journey(&self, org_id: Uuid, journey: &NewJourney) -> StoreResult<Journey> {
        let query = r#"
            INSERT INTO journeys (organization_id, title, description, cover_image_url, status, settings)
            VALUES ($1, $2, $3, $4, 'draft', $5)
            RETURNING *
        "#;

        sqlx::query_as::<_, Journey>(query)
            .bind(org_id)
            .bind(&journey.title)
            .bind(&journey.description)
            .bind(&journey.cover_image_url)
            .bind(&journey.settings)
            .fetch_one(self.pool())
            .await
            .map_err(|e| constraint_error(e, "Journey already exists", "Organization"))
    }

    async fn update_journey(&self, journey_id: Uuid, update: &JourneyUpdate) -> StoreResult<Journey> {
        let query = r#"
            UPDATE journeys
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                cover_image_url = COALESCE($4, cover_image_url),
                settings = COALESCE($5, settings),
                updated_at = now()
            WHERE id = $1
            RETURNING *
        "#;

        let journey = sqlx::query_as::<_, Journey>(query)
            .bind(journey_id)
            .bind(&update.title)
            .bind(&update.description)
            .bind(&update.cover_image_url)
            .bind(&update.settings)
            .fetch_optional(self.pool())
            .await?;
        required(journey, "Journey")
    }

    async fn set_journey_status(&self, journey_id: Uuid, status: JourneyStatus) -> StoreResult<Journey> {
        let journey = sqlx::query_as::<_, Journey>(
            "UPDATE journeys SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(journey_id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;
        required(journey, "Journey")
    }

    async fn delete_journey(&self, journey_id: Uuid) -> StoreResult<()> {
        // Steps, enrollments and completions go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM journeys WHERE id = $1")
            .bind(journey_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Journey"));
        }
        Ok(())
    }

    async fn list_steps(&self, journey_id: Uuid) -> StoreResult<Vec<JourneyStep>> {
        let steps = sqlx::query_as::<_, JourneyStep>(
            r#"SELECT * FROM journey_steps WHERE journey_id = $1 ORDER BY "order", created_at"#,
        )
        .bind(journey_id)
        .fetch_all(self.pool())
        .await?;
        Ok(steps)
    }

    async fn insert_step(&self, journey_id: Uuid, step: &NewStep) -> StoreResult<JourneyStep> {
        let mut tx = self.pool().begin().await?;

        let exists = sqlx::query("SELECT id FROM journeys WHERE id = $1 FOR UPDATE")
            .bind(journey_id)
            .fetch_optional(&mut *tx)
            .await?;
        required(exists, "Journey")?;

        let insert = r#"
            INSERT INTO journey_steps
                (journey_id, title, description, type, "order", points, content, is_required)
            VALUES (
                $1, $2, $3, $4,
                COALESCE($5, (SELECT COALESCE(MAX("order"), 0) + 1 FROM journey_steps WHERE journey_id = $1)),
                $6, $7, $8
            )
            RETURNING *
        "#;

        let row = sqlx::query_as::<_, JourneyStep>(insert)
            .bind(journey_id)
            .bind(&step.title)
            .bind(&step.description)
            .bind(step.step_type.as_str())
            .bind(step.order)
            .bind(step.points)
            .bind(&step.content)
            .bind(step.is_required)
            .fetch_one(&mut *tx)
            .await?;

        recount_journey(&mut tx, journey_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn delete_step(&self, journey_id: Uuid, step_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("DELETE FROM journey_steps WHERE id = $1 AND journey_id = $2")
            .bind(step_id)
            .bind(journey_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Step"));
        }

        recount_journey(&mut tx, journey_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_step(
        &self,
        journey_id: Uuid,
        step_id: Uuid,
        update: &StepUpdate,
    ) -> StoreResult<JourneyStep> {
        let mut tx = self.pool().begin().await?;

        let query = r#"
            UPDATE journey_steps
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                type = COALESCE($5, type),
                "order" = COALESCE($6, "order"),
                points = COALESCE($7, points),
                content = COALESCE($8, content),
                is_required = COALESCE($9, is_required),
                updated_at = now()
            WHERE id = $1 AND journey_id = $2
            RETURNING *
        "#;

        let step = sqlx::query_as::<_, JourneyStep>(query)
            .bind(step_id)
            .bind(journey_id)
            .bind(&update.title)
            .bind(&update.description)
            .bind(update.step_type.map(|t| t.as_str()))
            .bind(update.order)
            .bind(update.points)
            .bind(&update.content)
            .bind(update.is_required)
            .fetch_optional(&mut *tx)
            .await?;
        let step = required(step, "Step")?;

        if update.changes_totals() {
            recount_journey(&mut tx, journey_id).await?;
        }
        tx.commit().await?;
        Ok(step)
    }

    async fn reorder_steps(&self, journey_id: Uuid, step_order: &[Uuid]) -> StoreResult<Vec<JourneyStep>> {
        let mut tx = self.pool().begin().await?;

        let exists = sqlx::query("SELECT id FROM journeys WHERE id = $1 FOR UPDATE")
            .bind(journey_id)
            .fetch_optional(&mut *tx)
            .await?;
        required(exists, "Journey")?;

        let mut current: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM journey_steps WHERE journey_id = $1")
                .bind(journey_id)
                .fetch_all(&mut *tx)
                .await?;
        let mut given = step_order.to_vec();
        current.sort();
        given.sort();
        if current != given {
            return Err(StoreError::conflict("Step order must list every step exactly once"));
        }

        sqlx::query(
            r#"
            UPDATE journey_steps s
            SET "order" = o.idx::int, updated_at = now()
            FROM unnest($2::uuid[]) WITH ORDINALITY AS o(id, idx)
            WHERE s.id = o.id AND s.journey_id = $1
            "#,
        )
        .bind(journey_id)
        .bind(step_order)
        .execute(&mut *tx)
        .await?;

        let steps = steps_in(&mut tx, journey_id).await?;
        tx.commit().await?;
        Ok(steps)
    }

    async fn list_enrollments(&self, user_id: Uuid) -> StoreResult<Vec<EnrollmentWithJourney>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 ORDER BY enrolled_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let journey_ids: Vec<Uuid> = enrollments.iter().map(|e| e.journey_id).collect();
        let journeys: HashMap<Uuid, Journey> =
            sqlx::query_as::<_, Journey>("SELECT * FROM journeys WHERE id = ANY($1)")
                .bind(&journey_ids)
                .fetch_all(self.pool())
                .await?
                .into_iter()
                .map(|j| (j.id, j))
                .collect();

        Ok(enrollments
            .into_iter()
            .filter_map(|enrollment| {
                journeys
                    .get(&enrollment.journey_id)
                    .cloned()
                    .map(|journey| EnrollmentWithJourney { enrollment, journey })
            })
            .collect())
    }

    async fn list_journey_enrollments(&self, journey_id: Uuid) -> StoreResult<Vec<EnrollmentWithProfile>> {
        let rows = sqlx::query(
            r#"
            SELECT e.*, p.email AS profile_email, p.full_name AS profile_full_name,
                   p.avatar_url AS profile_avatar_url
            FROM enrollments e
            JOIN profiles p ON p.id = e.user_id
            WHERE e.journey_id = $1
            ORDER BY e.enrolled_at, e.id
            "#,
        )
        .bind(journey_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<EnrollmentWithProfile> {
                let enrollment = Enrollment::from_row(row)?;
                let user = ProfileSummary {
                    id: enrollment.user_id,
                    email: row.try_get("profile_email")?,
                    full_name: row.try_get("profile_full_name")?,
                    avatar_url: row.try_get("profile_avatar_url")?,
                };
                Ok(EnrollmentWithProfile { enrollment, user })
            })
            .collect()
    }

    async fn get_enrollment(&self, enrollment_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
            .bind(enrollment_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(enrollment)
    }

    async fn find_enrollment(&self, user_id: Uuid, journey_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE user_id = $1 AND journey_id = $2",
        )
        .bind(user_id)
        .bind(journey_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(enrollment)
    }

    async fn insert_enrollment(
        &self,
        user_id: Uuid,
        journey_id: Uuid,
        total_steps: i32,
    ) -> StoreResult<Enrollment> {
        let query = r#"
            INSERT INTO enrollments
                (journey_id, user_id, status, progress, completed_steps, total_steps, points_earned)
            VALUES ($1, $2, 'enrolled', 0, 0, $3, 0)
            RETURNING *
        "#;

        sqlx::query_as::<_, Enrollment>(query)
            .bind(journey_id)
            .bind(user_id)
            .bind(total_steps)
            .fetch_one(self.pool())
            .await
            .map_err(|e| constraint_error(e, "Already enrolled in this journey", "Journey"))
    }

    async fn reactivate_enrollment(&self, enrollment_id: Uuid) -> StoreResult<Enrollment> {
        let mut tx = self.pool().begin().await?;

        let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1 FOR UPDATE")
            .bind(enrollment_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut enrollment = required(enrollment, "Enrollment")?;

        let steps = steps_in(&mut tx, enrollment.journey_id).await?;
        let completions = completions_in(&mut tx, enrollment_id).await?;
        let now = Utc::now();
        enrollment.apply_completions(&steps, &completions, now);
        enrollment.enrolled_at = now;

        store_counters(&mut tx, &enrollment).await?;
        tx.commit().await?;
        Ok(enrollment)
    }

    async fn set_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> StoreResult<Enrollment> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "UPDATE enrollments SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(enrollment_id)
        .bind(status.as_str())
        .fetch_optional(self.pool())
        .await?;
        required(enrollment, "Enrollment")
    }

    async fn list_completions(&self, enrollment_id: Uuid) -> StoreResult<Vec<StepCompletion>> {
        let completions = sqlx::query_as::<_, StepCompletion>(
            "SELECT * FROM step_completions WHERE enrollment_id = $1 ORDER BY completed_at",
        )
        .bind(enrollment_id)
        .fetch_all(self.pool())
        .await?;
        Ok(completions)
    }

    async fn complete_step(
        &self,
        enrollment_id: Uuid,
        step_id: Uuid,
        submission_data: Option<Value>,
    ) -> StoreResult<CompletionOutcome> {
        let mut tx = self.pool().begin().await?;

        // Row lock serializes concurrent completions of the same enrollment
        let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1 FOR UPDATE")
            .bind(enrollment_id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut enrollment = required(enrollment, "Enrollment")?;
        if enrollment.is_dropped() {
            return Err(StoreError::conflict("Enrollment has been dropped"));
        }

        let steps = steps_in(&mut tx, enrollment.journey_id).await?;
        let step = required(steps.iter().find(|s| s.id == step_id), "Step")?;

        let inserted = sqlx::query_as::<_, StepCompletion>(
            r#"
            INSERT INTO step_completions (enrollment_id, step_id, points_awarded, submission_data)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (enrollment_id, step_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(enrollment_id)
        .bind(step_id)
        .bind(step.points)
        .bind(&submission_data)
        .fetch_optional(&mut *tx)
        .await?;

        let completion = match inserted {
            Some(completion) => completion,
            None => {
                let existing = sqlx::query_as::<_, StepCompletion>(
                    "SELECT * FROM step_completions WHERE enrollment_id = $1 AND step_id = $2",
                )
                .bind(enrollment_id)
                .bind(step_id)
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                return Ok(CompletionOutcome {
                    enrollment,
                    completion: existing,
                    newly_completed: false,
                });
            }
        };

        let completions = completions_in(&mut tx, enrollment_id).await?;
        enrollment.apply_completions(&steps, &completions, Utc::now());
        store_counters(&mut tx, &enrollment).await?;

        tx.commit().await?;

        Ok(CompletionOutcome {
            enrollment,
            completion,
            newly_completed: true,
        })
    }

    async fn list_badges(&self) -> StoreResult<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>("SELECT * FROM badges ORDER BY points_required NULLS LAST, name")
            .fetch_all(self.pool())
            .await?;
        Ok(badges)
    }

    async fn list_user_badges(&self, user_id: Uuid) -> StoreResult<Vec<EarnedBadge>> {
        let rows = sqlx::query(
            r#"
            SELECT b.*, ub.earned_at
            FROM user_badges ub
            JOIN badges b ON b.id = ub.badge_id
            WHERE ub.user_id = $1
            ORDER BY ub.earned_at
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<EarnedBadge> {
                Ok(EarnedBadge {
                    badge: Badge::from_row(row)?,
                    earned_at: row.try_get("earned_at")?,
                })
            })
            .collect()
    }

    async fn award_badge(&self, user_id: Uuid, badge_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(badge_id)
        .execute(self.pool())
        .await
        .map_err(|e| constraint_error(e, "Badge already awarded", "Badge"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn leaderboard_rows(&self, org_id: Uuid) -> StoreResult<Vec<LeaderboardRow>> {
        let rows = sqlx::query(
            r#"
            SELECT e.user_id, e.status, e.points_earned, p.full_name, p.avatar_url,
                   (SELECT COUNT(*) FROM user_badges ub WHERE ub.user_id = e.user_id) AS badges_count
            FROM enrollments e
            JOIN journeys j ON j.id = e.journey_id
            LEFT JOIN profiles p ON p.id = e.user_id
            WHERE j.organization_id = $1
            "#,
        )
        .bind(org_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(leaderboard_row).collect()
    }

    async fn record_audit(&self, entry: &NewAuditEntry) -> StoreResult<()> {
        let query = r#"
            INSERT INTO audit_logs
                (actor_id, organization_id, category_code, action, resource, metadata, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;

        sqlx::query(query)
            .bind(entry.actor_id)
            .bind(entry.organization_id)
            .bind(entry.category.as_str())
            .bind(entry.action.as_str())
            .bind(&entry.resource)
            .bind(&entry.metadata)
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

fn leaderboard_row(row: &PgRow) -> StoreResult<LeaderboardRow> {
    Ok(LeaderboardRow {
        user_id: row.try_get("user_id")?,
        full_name: row.try_get("full_name")?,
        avatar_url: row.try_get("avatar_url")?,
        status: decode_text(row, "status")?,
        points_earned: row.try_get("points_earned")?,
        badges_count: row.try_get("badges_count")?,
    })
}

async fn steps_in(tx: &mut PgTx<'_>, journey_id: Uuid) -> StoreResult<Vec<JourneyStep>> {
    let steps = sqlx::query_as::<_, JourneyStep>(
        r#"SELECT * FROM journey_steps WHERE journey_id = $1 ORDER BY "order", created_at"#,
    )
    .bind(journey_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(steps)
}

async fn completions_in(tx: &mut PgTx<'_>, enrollment_id: Uuid) -> StoreResult<Vec<StepCompletion>> {
    let completions = sqlx::query_as::<_, StepCompletion>(
        "SELECT * FROM step_completions WHERE enrollment_id = $1 ORDER BY completed_at",
    )
    .bind(enrollment_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(completions)
}

/// Write back the derived columns of an enrollment
async fn store_counters(tx: &mut PgTx<'_>, enrollment: &Enrollment) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE enrollments
        SET status = $2, progress = $3, completed_steps = $4, total_steps = $5,
            points_earned = $6, completed_at = $7, enrolled_at = $8
        WHERE id = $1
        "#,
    )
    .bind(enrollment.id)
    .bind(enrollment.status.as_str())
    .bind(enrollment.progress)
    .bind(enrollment.completed_steps)
    .bind(enrollment.total_steps)
    .bind(enrollment.points_earned)
    .bind(enrollment.completed_at)
    .bind(enrollment.enrolled_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Recompute the counters of every live enrollment in a journey. Dropped
/// enrollments are recomputed when they are reactivated.
async fn recount_enrollments(tx: &mut PgTx<'_>, journey_id: Uuid) -> StoreResult<()> {
    let enrollments = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE journey_id = $1 AND status <> 'dropped' FOR UPDATE",
    )
    .bind(journey_id)
    .fetch_all(&mut **tx)
    .await?;
    if enrollments.is_empty() {
        return Ok(());
    }

    let steps = steps_in(tx, journey_id).await?;
    let now = Utc::now();
    for mut enrollment in enrollments {
        let completions = completions_in(tx, enrollment.id).await?;
        enrollment.apply_completions(&steps, &completions, now);
        store_counters(tx, &enrollment).await?;
    }
    Ok(())
}

async fn recount_journey(tx: &mut PgTx<'_>, journey_id: Uuid) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE journeys
        SET total_steps = (SELECT COUNT(*) FROM journey_steps WHERE journey_id = $1),
            total_points = (SELECT COALESCE(SUM(points), 0) FROM journey_steps WHERE journey_id = $1),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(journey_id)
    .execute(&mut **tx)
    .await?;

    recount_enrollments(tx, journey_id).await
}
