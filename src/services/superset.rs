//! Guest tokens for embedded Superset dashboards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::SupersetConfig;

/// Messages are shown to the end user as-is
#[derive(Debug, Error)]
pub enum SupersetError {
    #[error("Superset Login falló: {0}")]
    Login(u16),

    #[error("No se pudo generar el Guest Token")]
    GuestToken,

    #[error("Superset no responde (Timeout)")]
    Timeout,

    #[error("Error de conexión: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for SupersetError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SupersetError::Timeout
        } else {
            SupersetError::Connection(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestToken {
    pub token: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GuestTokenResponse {
    token: String,
}

#[derive(Clone)]
pub struct SupersetClient {
    client: reqwest::Client,
    domain: String,
    username: String,
    password: String,
}

impl SupersetClient {
    pub fn new(config: &SupersetConfig) -> Result<Self, SupersetError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            domain: config.domain.strip_suffix('/').unwrap_or(&config.domain).to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Log in as the service account, then exchange its access token for a
    /// guest token scoped to one dashboard
    pub async fn guest_token(&self, dashboard_id: &str) -> Result<GuestToken, SupersetError> {
        if self.domain.is_empty() {
            return Err(SupersetError::Connection("SUPERSET_DOMAIN is not configured".to_string()));
        }
        tracing::info!("Requesting Superset login at {}/api/v1/security/login", self.domain);

        let login = self
            .client
            .post(format!("{}/api/v1/security/login", self.domain))
            .json(&json!({
                "username": self.username,
                "password": self.password,
                "provider": "db",
            }))
            .send()
            .await?;

        if !login.status().is_success() {
            let status = login.status().as_u16();
            let body = login.text().await.unwrap_or_default();
            tracing::error!("Superset login failed ({}): {}", status, body);
            return Err(SupersetError::Login(status));
        }
        let access_token = login.json::<LoginResponse>().await?.access_token;

        let guest = self
            .client
            .post(format!("{}/api/v1/security/guest_token/", self.domain))
            .bearer_auth(access_token)
            .json(&json!({
                "user": { "username": "guest_user", "first_name": "Guest", "last_name": "User" },
                "resources": [{ "type": "dashboard", "id": dashboard_id }],
                "rls": [],
            }))
            .send()
            .await?;

        if !guest.status().is_success() {
            let status = guest.status().as_u16();
            let body = guest.text().await.unwrap_or_default();
            tracing::error!("Superset guest token failed ({}): {}", status, body);
            return Err(SupersetError::GuestToken);
        }

        let token = guest.json::<GuestTokenResponse>().await?.token;
        Ok(GuestToken { token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(domain: &str) -> SupersetConfig {
        SupersetConfig {
            domain: domain.to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            timeout_secs: 10,
        }
    }

    #[test]
    fn trims_one_trailing_slash() {
        let client = SupersetClient::new(&config("https://bi.example.com/")).unwrap();
        assert_eq!(client.domain(), "https://bi.example.com");

        let client = SupersetClient::new(&config("https://bi.example.com")).unwrap();
        assert_eq!(client.domain(), "https://bi.example.com");
    }

    #[test]
    fn error_messages() {
        assert_eq!(SupersetError::Login(401).to_string(), "Superset Login falló: 401");
        assert_eq!(SupersetError::GuestToken.to_string(), "No se pudo generar el Guest Token");
        assert_eq!(SupersetError::Timeout.to_string(), "Superset no responde (Timeout)");
    }

    #[tokio::test]
    async fn missing_domain_is_a_connection_error() {
        let client = SupersetClient::new(&config("")).unwrap();
        let result = client.guest_token("dash").await;
        assert!(matches!(result, Err(SupersetError::Connection(_))));
    }
}
