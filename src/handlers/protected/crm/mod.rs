// handlers/protected/crm/mod.rs - Mock CRM directory (/api/crm/*)
//
// Every route requires the facilitador role or higher in the current
// organization.
pub mod contacts;
pub mod events;
pub mod workshops;

pub use contacts::{create as contact_create, list as contacts_list, show as contact_show};
pub use events::{list as events_list, track as event_track};
pub use workshops::{create as workshop_create, list as workshops_list, show as workshop_show};

use crate::auth::org_context::OrgContext;
use crate::auth::Role;
use crate::error::ApiError;

pub(crate) fn require_crm_access(context: &OrgContext) -> Result<(), ApiError> {
    super::require_role(context, Role::Facilitador).map(|_| ())
}
