//! Mock CRM directory: contacts, workshops and tracked events.
//!
//! Everything lives in one JSON document whose keys match the browser
//! storage keys of the demo front end. The document is written back to disk
//! after each change when a storage path is configured.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::CrmConfig;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Invalid(String),

    #[error("CRM storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CRM document is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

crate::string_enum! {
    pub enum ContactLevel {
        Explorador => "Explorador",
        Activo => "Activo",
        Embajador => "Embajador",
    }
}

crate::string_enum! {
    pub enum ContactStatus {
        Active => "active",
        Inactive => "inactive",
        Lead => "lead",
    }
}

crate::string_enum! {
    pub enum WorkshopStatus {
        Draft => "draft",
        Published => "published",
        Completed => "completed",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 0-100
    pub engagement_score: u8,
    pub joined_at: DateTime<Utc>,
    pub level: ContactLevel,
    pub xp: u32,
    pub status: ContactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Fields accepted when creating a contact; anything omitted takes the
/// default of a fresh lead
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<Vec<String>>,
    pub engagement_score: Option<u8>,
    pub joined_at: Option<DateTime<Utc>>,
    pub level: Option<ContactLevel>,
    pub xp: Option<u32>,
    pub status: Option<ContactStatus>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workshop {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub capacity: u32,
    pub enrolled_count: u32,
    pub status: WorkshopStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkshop {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub enrolled_count: Option<u32>,
    pub status: Option<WorkshopStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackEventRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// On-disk layout. A missing key is distinct from an empty list: workshops
/// are only seeded when their key has never been written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CrmDocument {
    #[serde(rename = "oasis_mock_contacts", default, skip_serializing_if = "Option::is_none")]
    contacts: Option<Vec<Contact>>,
    #[serde(rename = "oasis_mock_workshops", default, skip_serializing_if = "Option::is_none")]
    workshops: Option<Vec<Workshop>>,
    #[serde(rename = "oasis_mock_events", default, skip_serializing_if = "Option::is_none")]
    events: Option<Vec<TrackedEvent>>,
}

const FIRST_NAMES: [&str; 20] = [
    "Ana", "Carlos", "Sofia", "Miguel", "Valentina", "Javier", "Camila", "Andres", "Lucia", "Diego",
    "Maria", "Jose", "Fernanda", "Ricardo", "Isabella", "Daniel", "Paula", "Gabriel", "Elena", "Hugo",
];

const LAST_NAMES: [&str; 20] = [
    "Pérez", "Díaz", "Lagos", "Silva", "Rojas", "González", "Muñoz", "Castro", "Vargas", "Torres",
    "Fernandez", "Ramirez", "Soto", "Contreras", "Rodriguez", "Morales", "Herrera", "Sepulveda", "Fuentes",
    "Mendoza",
];

const ORGANIZATIONS: [&str; 13] = [
    "TechCorp",
    "Fundación Educa",
    "Bankia",
    "Minera Andes",
    "Retail Global",
    "Salud Plus",
    "Constructora Viga",
    "AgroChile",
    "Innovación SpA",
    "Consultora Beta",
    "Fundación Summer",
    "Colegio San Juan",
    "Hospital Central",
];

const TAGS: [&str; 8] = [
    "vip",
    "donante",
    "taller-verano",
    "newsletter",
    "interesado-taller",
    "baja-interaccion",
    "nuevo-ingreso",
    "voluntario",
];

/// Level and status implied by an engagement score
pub fn classify(score: u8) -> (ContactLevel, ContactStatus) {
    match score {
        81..=u8::MAX => (ContactLevel::Embajador, ContactStatus::Active),
        41..=80 => (ContactLevel::Activo, ContactStatus::Active),
        _ => (ContactLevel::Explorador, ContactStatus::Lead),
    }
}

/// One random contact
pub fn generate_contact<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Contact {
    let first = *FIRST_NAMES.choose(rng).unwrap_or(&FIRST_NAMES[0]);
    let last = *LAST_NAMES.choose(rng).unwrap_or(&LAST_NAMES[0]);
    let organization = *ORGANIZATIONS.choose(rng).unwrap_or(&ORGANIZATIONS[0]);
    let score: u8 = rng.gen_range(0..100);
    let (level, status) = classify(score);

    let mut tags = vec![TAGS.choose(rng).unwrap_or(&TAGS[0]).to_string()];
    if rng.gen_bool(0.3) {
        tags.push(TAGS.choose(rng).unwrap_or(&TAGS[0]).to_string());
    }

    let domain: String = organization.to_lowercase().split_whitespace().collect();

    Contact {
        id: Uuid::new_v4(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@{}.cl", first.to_lowercase(), last.to_lowercase(), domain),
        role: Some("Profesional".to_string()),
        organization: Some(organization.to_string()),
        phone: Some(format!("+56 9 {}", rng.gen_range(10_000_000..100_000_000))),
        tags,
        engagement_score: score,
        joined_at: now - Duration::milliseconds(rng.gen_range(0..10_000_000_000)),
        level,
        xp: u32::from(score) * 15 + rng.gen_range(0..500),
        status,
        last_seen: Some(now - Duration::milliseconds(rng.gen_range(0..100_000_000))),
    }
}

/// The fixed contact every fresh directory starts with
fn anchor_contact(now: DateTime<Utc>) -> Contact {
    Contact {
        id: Uuid::new_v4(),
        first_name: "Ana".to_string(),
        last_name: "Pérez".to_string(),
        email: "ana.perez@techcorp.com".to_string(),
        role: Some("Gerente de RRHH".to_string()),
        organization: Some("TechCorp".to_string()),
        phone: Some("+56 9 1234 5678".to_string()),
        tags: vec!["taller-verano".to_string(), "newsletter".to_string()],
        engagement_score: 85,
        joined_at: now,
        level: ContactLevel::Embajador,
        xp: 1250,
        status: ContactStatus::Active,
        last_seen: Some(now),
    }
}

fn initial_workshops(now: DateTime<Utc>) -> Vec<Workshop> {
    vec![
        Workshop {
            id: Uuid::new_v4(),
            title: "Taller de Liderazgo Joven".to_string(),
            date: now + Duration::days(5),
            capacity: 30,
            enrolled_count: 12,
            status: WorkshopStatus::Published,
        },
        Workshop {
            id: Uuid::new_v4(),
            title: "Gestión Emocional".to_string(),
            date: now + Duration::days(15),
            capacity: 20,
            enrolled_count: 5,
            status: WorkshopStatus::Draft,
        },
    ]
}

/// Top up a sparse directory and create the initial workshops. Returns
/// whether anything changed.
fn seed_document<R: Rng + ?Sized>(
    document: &mut CrmDocument,
    rng: &mut R,
    now: DateTime<Utc>,
    min_contacts: usize,
    seed_batch: usize,
) -> bool {
    let mut changed = false;

    let contacts = document.contacts.get_or_insert_with(Vec::new);
    if contacts.len() < min_contacts {
        if contacts.is_empty() {
            contacts.push(anchor_contact(now));
        }
        contacts.extend((0..seed_batch).map(|_| generate_contact(rng, now)));
        changed = true;
    }

    if document.workshops.is_none() {
        document.workshops = Some(initial_workshops(now));
        changed = true;
    }

    changed
}

pub struct CrmStorage {
    path: Option<PathBuf>,
    min_contacts: usize,
    seed_batch: usize,
    document: Mutex<CrmDocument>,
}

impl CrmStorage {
    /// Load the document from the configured path. A missing file starts
    /// an empty directory; no path keeps everything in memory.
    pub async fn open(config: &CrmConfig) -> Result<Self, CrmError> {
        let document = match &config.storage_path {
            Some(path) => load(path).await?,
            None => CrmDocument::default(),
        };

        Ok(Self {
            path: config.storage_path.clone(),
            min_contacts: config.min_contacts,
            seed_batch: config.seed_batch,
            document: Mutex::new(document),
        })
    }

    pub fn in_memory(config: &CrmConfig) -> Self {
        Self {
            path: None,
            min_contacts: config.min_contacts,
            seed_batch: config.seed_batch,
            document: Mutex::new(CrmDocument::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn contacts(&self) -> Result<Vec<Contact>, CrmError> {
        let mut document = self.document.lock().await;
        self.ensure_seeded(&mut document).await?;
        Ok(document.contacts.clone().unwrap_or_default())
    }

    pub async fn contact(&self, id: Uuid) -> Result<Contact, CrmError> {
        self.contacts()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or(CrmError::NotFound("Contact"))
    }

    pub async fn create_contact(&self, input: NewContact) -> Result<Contact, CrmError> {
        if let Some(score) = input.engagement_score {
            if score > 100 {
                return Err(CrmError::Invalid("engagementScore must be between 0 and 100".to_string()));
            }
        }

        let now = Utc::now();
        let contact = Contact {
            id: Uuid::new_v4(),
            first_name: input.first_name.unwrap_or_default(),
            last_name: input.last_name.unwrap_or_default(),
            email: input.email.unwrap_or_default(),
            role: input.role,
            organization: input.organization,
            phone: input.phone,
            tags: input.tags.unwrap_or_default(),
            engagement_score: input.engagement_score.unwrap_or(50),
            joined_at: input.joined_at.unwrap_or(now),
            level: input.level.unwrap_or(ContactLevel::Explorador),
            xp: input.xp.unwrap_or(0),
            status: input.status.unwrap_or(ContactStatus::Lead),
            last_seen: input.last_seen,
        };

        let mut document = self.document.lock().await;
        self.ensure_seeded(&mut document).await?;
        let mut next = document.clone();
        next.contacts.get_or_insert_with(Vec::new).push(contact.clone());
        self.commit(&mut document, next).await?;

        Ok(contact)
    }

    pub async fn workshops(&self) -> Result<Vec<Workshop>, CrmError> {
        let mut document = self.document.lock().await;
        self.ensure_seeded(&mut document).await?;
        Ok(document.workshops.clone().unwrap_or_default())
    }

    pub async fn workshop(&self, id: Uuid) -> Result<Workshop, CrmError> {
        self.workshops()
            .await?
            .into_iter()
            .find(|w| w.id == id)
            .ok_or(CrmError::NotFound("Workshop"))
    }

    pub async fn create_workshop(&self, input: NewWorkshop) -> Result<Workshop, CrmError> {
        let workshop = Workshop {
            id: Uuid::new_v4(),
            title: input.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Nuevo Taller".to_string()),
            date: input.date.unwrap_or_else(Utc::now),
            capacity: input.capacity.filter(|c| *c > 0).unwrap_or(20),
            enrolled_count: input.enrolled_count.unwrap_or(0),
            status: input.status.unwrap_or(WorkshopStatus::Draft),
        };

        let mut document = self.document.lock().await;
        self.ensure_seeded(&mut document).await?;
        let mut next = document.clone();
        next.workshops.get_or_insert_with(Vec::new).push(workshop.clone());
        self.commit(&mut document, next).await?;

        Ok(workshop)
    }

    pub async fn track_event(&self, request: TrackEventRequest, user_id: Option<Uuid>) -> Result<TrackedEvent, CrmError> {
        if request.event_type.trim().is_empty() {
            return Err(CrmError::Invalid("Event type is required".to_string()));
        }

        let event = TrackedEvent {
            event_type: request.event_type,
            metadata: request.metadata,
            timestamp: Utc::now(),
            user_id,
        };
        tracing::info!(event_type = %event.event_type, "Tracked CRM event");

        let mut document = self.document.lock().await;
        let mut next = document.clone();
        next.events.get_or_insert_with(Vec::new).push(event.clone());
        self.commit(&mut document, next).await?;

        Ok(event)
    }

    pub async fn events(&self) -> Vec<TrackedEvent> {
        self.document.lock().await.events.clone().unwrap_or_default()
    }

    async fn ensure_seeded(&self, document: &mut CrmDocument) -> Result<(), CrmError> {
        let mut next = document.clone();
        let changed = {
            let mut rng = rand::thread_rng();
            seed_document(&mut next, &mut rng, Utc::now(), self.min_contacts, self.seed_batch)
        };

        if changed {
            tracing::info!(
                contacts = next.contacts.as_ref().map_or(0, Vec::len),
                "Seeded mock CRM directory"
            );
            self.commit(document, next).await?;
        }
        Ok(())
    }

    /// Write `next` to disk, then make it the live document. A failed write
    /// leaves the live document untouched.
    async fn commit(&self, document: &mut CrmDocument, next: CrmDocument) -> Result<(), CrmError> {
        self.persist(&next).await?;
        *document = next;
        Ok(())
    }

    async fn persist(&self, document: &CrmDocument) -> Result<(), CrmError> {
        let Some(path) = &self.path else { return Ok(()) };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec_pretty(document)?).await?;
        Ok(())
    }
}

async fn load(path: &Path) -> Result<CrmDocument, CrmError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CrmDocument::default()),
        Err(e) => Err(e.into()),
    }
}
