use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::decode_text;

crate::string_enum! {
    pub enum OrganizationType {
        Community => "community",
        Provider => "provider",
        Sponsor => "sponsor",
        Enterprise => "enterprise",
    }
}

/// An organization using the portal. Feature flags and branding live in the free-form `settings`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    #[serde(rename = "type")]
    pub org_type: OrganizationType,
    pub settings: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Organization {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            logo_url: row.try_get("logo_url")?,
            org_type: decode_text(row, "type")?,
            settings: row.try_get("settings")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(rename = "type", default = "default_org_type")]
    pub org_type: OrganizationType,
    #[serde(default = "empty_settings")]
    pub settings: Value,
}

fn default_org_type() -> OrganizationType {
    OrganizationType::Community
}

fn empty_settings() -> Value {
    Value::Object(Default::default())
}

/// Editable organization fields; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub settings: Option<Value>,
}

impl OrganizationUpdate {
    pub fn apply(&self, organization: &mut Organization) {
        if let Some(name) = &self.name {
            organization.name = name.clone();
        }
        if let Some(description) = &self.description {
            organization.description = Some(description.clone());
        }
        if let Some(logo_url) = &self.logo_url {
            organization.logo_url = Some(logo_url.clone());
        }
        if let Some(settings) = &self.settings {
            organization.settings = settings.clone();
        }
    }
}
