use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{decode_text, Organization, ProfileSummary};
use crate::auth::Role;

crate::string_enum! {
    pub enum MembershipStatus {
        Active => "active",
        Invited => "invited",
        Suspended => "suspended",
        Inactive => "inactive",
    }
}

/// Row of `organization_members`: one user's role inside one organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
    pub invited_by: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
}

impl OrganizationMember {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

impl<'r> FromRow<'r, PgRow> for OrganizationMember {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            user_id: row.try_get("user_id")?,
            role: decode_text(row, "role")?,
            status: decode_text(row, "status")?,
            invited_by: row.try_get("invited_by")?,
            joined_at: row.try_get("joined_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberWithProfile {
    #[serde(flatten)]
    pub member: OrganizationMember,
    pub profile: ProfileSummary,
}

/// A membership joined with its organization, as listed in the org switcher
#[derive(Debug, Clone, Serialize)]
pub struct MembershipWithOrganization {
    pub organization: Organization,
    pub membership: OrganizationMember,
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub status: MembershipStatus,
    pub invited_by: Option<Uuid>,
}
