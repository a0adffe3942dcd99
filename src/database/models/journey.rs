use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{decode_text, Enrollment};

crate::string_enum! {
    pub enum JourneyStatus {
        Draft => "draft",
        Active => "active",
        Archived => "archived",
        Completed => "completed",
    }
}

crate::string_enum! {
    pub enum StepType {
        Content => "content",
        Quiz => "quiz",
        Task => "task",
        Typeform => "typeform",
        Video => "video",
        Link => "link",
    }
}

/// A course: an ordered list of steps owned by one organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub status: JourneyStatus,
    pub settings: Value,
    pub total_steps: i32,
    pub total_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Journey {
    /// Refresh the step count and point total from the journey's steps
    pub fn recount(&mut self, steps: &[JourneyStep]) {
        self.total_steps = steps.len() as i32;
        self.total_points = steps.iter().map(|s| s.points).sum();
    }
}

impl<'r> FromRow<'r, PgRow> for Journey {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            organization_id: row.try_get("organization_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            cover_image_url: row.try_get("cover_image_url")?,
            status: decode_text(row, "status")?,
            settings: row.try_get("settings")?,
            total_steps: row.try_get("total_steps")?,
            total_points: row.try_get("total_points")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyStep {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub order: i32,
    pub points: i32,
    pub content: Value,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for JourneyStep {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            journey_id: row.try_get("journey_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            step_type: decode_text(row, "type")?,
            order: row.try_get("order")?,
            points: row.try_get("points")?,
            content: row.try_get("content")?,
            is_required: row.try_get("is_required")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Journey as seen by one user: the journey plus their enrollment, if any.
/// A dropped enrollment is still returned but does not count as enrolled.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyWithEnrollment {
    #[serde(flatten)]
    pub journey: Journey,
    pub enrollment: Option<Enrollment>,
    pub is_enrolled: bool,
}

impl JourneyWithEnrollment {
    pub fn new(journey: Journey, enrollment: Option<Enrollment>) -> Self {
        let is_enrolled = enrollment.as_ref().is_some_and(|e| !e.is_dropped());
        Self { journey, enrollment, is_enrolled }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewJourney {
    pub title: String,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default = "empty_object")]
    pub settings: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JourneyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub settings: Option<Value>,
}

impl JourneyUpdate {
    pub fn apply(&self, journey: &mut Journey) {
        if let Some(title) = &self.title {
            journey.title = title.clone();
        }
        if let Some(description) = &self.description {
            journey.description = Some(description.clone());
        }
        if let Some(cover) = &self.cover_image_url {
            journey.cover_image_url = Some(cover.clone());
        }
        if let Some(settings) = &self.settings {
            journey.settings = settings.clone();
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStep {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type", default = "default_step_type")]
    pub step_type: StepType,
    /// Appended after the last step when omitted
    pub order: Option<i32>,
    #[serde(default)]
    pub points: i32,
    #[serde(default = "empty_object")]
    pub content: Value,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

/// Editable step fields; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub step_type: Option<StepType>,
    pub order: Option<i32>,
    pub points: Option<i32>,
    pub content: Option<Value>,
    pub is_required: Option<bool>,
}

impl StepUpdate {
    pub fn apply(&self, step: &mut JourneyStep) {
        if let Some(title) = &self.title {
            step.title = title.clone();
        }
        if let Some(description) = &self.description {
            step.description = Some(description.clone());
        }
        if let Some(step_type) = self.step_type {
            step.step_type = step_type;
        }
        if let Some(order) = self.order {
            step.order = order;
        }
        if let Some(points) = self.points {
            step.points = points;
        }
        if let Some(content) = &self.content {
            step.content = content.clone();
        }
        if let Some(is_required) = self.is_required {
            step.is_required = is_required;
        }
    }

    /// Whether the change can move enrollment counters or journey totals
    pub fn changes_totals(&self) -> bool {
        self.points.is_some() || self.is_required.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepReorder {
    pub step_order: Vec<Uuid>,
}

fn empty_object() -> Value {
    json!({})
}

fn default_step_type() -> StepType {
    StepType::Content
}

fn default_required() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_step_defaults() {
        let step: NewStep = serde_json::from_value(json!({ "title": "Bienvenida" })).unwrap();
        assert_eq!(step.step_type, StepType::Content);
        assert!(step.is_required);
        assert_eq!(step.points, 0);
        assert_eq!(step.order, None);
        assert_eq!(step.content, json!({}));
    }

    #[test]
    fn step_update_touches_only_given_fields() {
        let now = Utc::now();
        let mut step = JourneyStep {
            id: Uuid::new_v4(),
            journey_id: Uuid::new_v4(),
            title: "Bienvenida".to_string(),
            description: None,
            step_type: StepType::Content,
            order: 1,
            points: 10,
            content: json!({}),
            is_required: true,
            created_at: now,
            updated_at: now,
        };
        let update: StepUpdate =
            serde_json::from_value(json!({ "type": "quiz", "is_required": false })).unwrap();
        update.apply(&mut step);

        assert_eq!(step.step_type, StepType::Quiz);
        assert!(!step.is_required);
        assert_eq!(step.title, "Bienvenida");
        assert_eq!(step.points, 10);
        assert!(update.changes_totals());

        let rename: StepUpdate = serde_json::from_value(json!({ "title": "Hola" })).unwrap();
        assert!(!rename.changes_totals());
    }

    #[test]
    fn journey_with_enrollment_flattens() {
        let now = Utc::now();
        let journey = Journey {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            title: "Liderazgo".to_string(),
            description: None,
            cover_image_url: None,
            status: JourneyStatus::Active,
            settings: json!({}),
            total_steps: 3,
            total_points: 60,
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(JourneyWithEnrollment::new(journey, None)).unwrap();
        assert_eq!(value["title"], "Liderazgo");
        assert_eq!(value["status"], "active");
        assert_eq!(value["is_enrolled"], false);
        assert!(value["enrollment"].is_null());
    }
}
