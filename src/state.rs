use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseError, DatabaseManager, MemoryStore, PgStore, PortalStore};
use crate::services::chat::{ChatProvider, ChatService, GeminiProvider};
use crate::services::crm::{CrmError, CrmStorage};
use crate::services::enrollment_service::EnrollmentService;
use crate::services::gamification::GamificationService;
use crate::services::identity::{IdentityProvider, SupabaseIdentity};
use crate::services::journey_service::JourneyService;
use crate::services::member_service::MemberService;
use crate::services::organization_service::OrganizationService;
use crate::services::superset::{SupersetClient, SupersetError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crm(#[from] CrmError),

    #[error(transparent)]
    Superset(#[from] SupersetError),
}

/// Shared application state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn PortalStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub chat_provider: Arc<dyn ChatProvider>,
    pub superset: SupersetClient,
    pub crm: Arc<CrmStorage>,
}

impl AppState {
    /// Wire the configured backends
    pub async fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let store: Arc<dyn PortalStore> = match config.database.backend {
            StoreBackend::Postgres => {
                let db = DatabaseManager::connect(&config.database)?;
                Arc::new(PgStore::new(db))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory demo store; data is lost on restart");
                Arc::new(MemoryStore::demo())
            }
        };

        let identity = SupabaseIdentity::from_config(&config.supabase);
        let chat_provider = GeminiProvider::from_config(&config.ai);
        let superset = SupersetClient::new(&config.superset)?;
        let crm = Arc::new(CrmStorage::open(&config.crm).await?);

        Ok(Self::new(config, store, identity, chat_provider, superset, crm))
    }

    /// Assemble state from explicit backends; tests swap in fakes here
    pub fn new(
        config: AppConfig,
        store: Arc<dyn PortalStore>,
        identity: Arc<dyn IdentityProvider>,
        chat_provider: Arc<dyn ChatProvider>,
        superset: SupersetClient,
        crm: Arc<CrmStorage>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            identity,
            chat_provider,
            superset,
            crm,
        }
    }

    pub fn members(&self) -> MemberService {
        MemberService::new(self.store.clone(), self.identity.clone())
    }

    pub fn organizations(&self) -> OrganizationService {
        OrganizationService::new(self.store.clone())
    }

    pub fn journeys(&self) -> JourneyService {
        JourneyService::new(self.store.clone())
    }

    pub fn enrollments(&self) -> EnrollmentService {
        EnrollmentService::new(self.store.clone())
    }

    pub fn gamification(&self) -> GamificationService {
        GamificationService::new(self.store.clone())
    }

    pub fn chat(&self) -> ChatService {
        ChatService::new(self.chat_provider.clone())
    }
}
