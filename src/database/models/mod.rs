pub mod audit;
pub mod badge;
pub mod enrollment;
pub mod journey;
pub mod member;
pub mod organization;
pub mod profile;

pub use audit::{AuditAction, AuditCategory, AuditEntry, NewAuditEntry};
pub use badge::{Badge, EarnedBadge};
pub use enrollment::{
    progress_percent, Enrollment, EnrollmentProgress, EnrollmentStatus, EnrollmentWithJourney,
    EnrollmentWithProfile, StepCompletion,
};
pub use journey::{
    Journey, JourneyStatus, JourneyStep, JourneyUpdate, JourneyWithEnrollment, NewJourney, NewStep,
    StepReorder, StepType, StepUpdate,
};
pub use member::{
    MemberWithProfile, MembershipStatus, MembershipWithOrganization, NewMember, OrganizationMember,
};
pub use organization::{NewOrganization, Organization, OrganizationType, OrganizationUpdate};
pub use profile::{AccountStatus, Profile, ProfileSummary, ProfileUpdate};

use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::types::UnknownVariant;

/// Read a text column into one of the string enums, surfacing unknown values
/// as decode errors
pub(crate) fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
