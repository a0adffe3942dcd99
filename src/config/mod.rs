use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub supabase: SupabaseConfig,
    pub ai: AiConfig,
    pub superset: SupersetConfig,
    pub crm: CrmConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Which persistence backend the server runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub session_cookie_name: String,
    pub org_cookie_name: String,
    pub org_cookie_max_age_days: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupersetConfig {
    pub domain: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    pub storage_path: Option<PathBuf>,
    pub min_contacts: usize,
    pub seed_batch: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = env::var("OASIS_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("OASIS_STORE") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" | "pg" => self.database.backend = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown OASIS_STORE value '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_AUDIENCE") {
            self.security.jwt_audience = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }

        // Supabase
        self.supabase.url = env::var("SUPABASE_URL").ok().or(self.supabase.url);
        self.supabase.anon_key = env::var("SUPABASE_ANON_KEY").ok().or(self.supabase.anon_key);
        self.supabase.service_role_key = env::var("SUPABASE_SERVICE_ROLE_KEY").ok().or(self.supabase.service_role_key);

        // AI chat
        self.ai.api_key = env::var("GOOGLE_API_KEY").ok().or(self.ai.api_key);
        if let Ok(v) = env::var("AI_MODEL") {
            self.ai.model = v;
        }
        if let Ok(v) = env::var("AI_BASE_URL") {
            self.ai.base_url = v;
        }
        if let Ok(v) = env::var("AI_TIMEOUT_SECS") {
            self.ai.timeout_secs = v.parse().unwrap_or(self.ai.timeout_secs);
        }

        // Superset
        if let Ok(v) = env::var("SUPERSET_DOMAIN") {
            self.superset.domain = v;
        }
        if let Ok(v) = env::var("SUPERSET_ADMIN_USERNAME") {
            self.superset.username = v;
        }
        if let Ok(v) = env::var("SUPERSET_ADMIN_PASSWORD") {
            self.superset.password = v;
        }
        if let Ok(v) = env::var("SUPERSET_TIMEOUT_SECS") {
            self.superset.timeout_secs = v.parse().unwrap_or(self.superset.timeout_secs);
        }

        // Mock CRM
        if let Ok(v) = env::var("CRM_STORAGE_PATH") {
            self.crm.storage_path = if v.is_empty() { None } else { Some(PathBuf::from(v)) };
        }
        if let Ok(v) = env::var("CRM_MIN_CONTACTS") {
            self.crm.min_contacts = v.parse().unwrap_or(self.crm.min_contacts);
        }
        if let Ok(v) = env::var("CRM_SEED_BATCH") {
            self.crm.seed_batch = v.parse().unwrap_or(self.crm.seed_batch);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "oasis-development-secret".to_string(),
                jwt_audience: "authenticated".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                session_cookie_name: "oasis_session".to_string(),
                org_cookie_name: "oasis_current_org".to_string(),
                org_cookie_max_age_days: 365,
                secure_cookies: false,
            },
            supabase: SupabaseConfig::default(),
            ai: AiConfig::default(),
            superset: SupersetConfig::default(),
            crm: CrmConfig {
                storage_path: None,
                min_contacts: 5,
                seed_batch: 50,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.backend = StoreBackend::Postgres;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.jwt_secret = String::new();
        config.security.jwt_expiry_hours = 24;
        config.security.cors_origins = vec!["https://staging.oasis.example.com".to_string()];
        config.security.secure_cookies = true;
        config.crm.storage_path = Some(PathBuf::from("data/oasis_mock_crm.json"));
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.jwt_expiry_hours = 1;
        config.security.cors_origins = vec!["https://app.oasis.example.com".to_string()];
        config
    }

    pub fn is_production_like(&self) -> bool {
        !matches!(self.environment, Environment::Development)
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            service_role_key: None,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            // Chat responses stream for at most 30 seconds
            timeout_secs: 30,
        }
    }
}

impl Default for SupersetConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: 10,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.security.org_cookie_name, "oasis_current_org");
        assert_eq!(config.security.org_cookie_max_age_days, 365);
        assert!(!config.security.secure_cookies);
        assert_eq!(config.superset.timeout_secs, 10);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.database.backend, StoreBackend::Postgres);
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.security.secure_cookies);
        assert!(config.is_production_like());
        assert_eq!(config.crm.min_contacts, 5);
    }
}
