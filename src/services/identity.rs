//! Identity provider (Supabase Auth) client.
//!
//! Credentials never touch the portal database: sign-up, sign-in, token
//! refresh and password recovery all go to the provider, and new people are
//! invited through its admin API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Role;
use crate::config::SupabaseConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Email is already registered")]
    AlreadyRegistered,

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("Identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Session returned by a successful sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub user: IdentityUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Organization invitation attached to the provider's user metadata, picked
/// up when the invited person finishes registration
#[derive(Debug, Clone, Serialize)]
pub struct InvitationMetadata {
    pub invited_to_org: Uuid,
    pub invited_role: Role,
    pub invited_by: Option<Uuid>,
}

/// Account details collected at sign-up
#[derive(Debug, Clone)]
pub struct SignUp<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; the provider sends its own confirmation email
    async fn sign_up(&self, account: &SignUp<'_>) -> Result<IdentityUser, IdentityError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError>;

    /// Exchange a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> Result<IdentitySession, IdentityError>;

    /// Email a password recovery link. Unknown addresses are not reported.
    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Set a new password for the user the (recovery) access token belongs to
    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), IdentityError>;

    /// Send an invitation email that creates the account on acceptance
    async fn invite_user_by_email(&self, email: &str, invitation: &InvitationMetadata) -> Result<(), IdentityError>;

    /// Re-send a one-time sign-in link to an already invited address
    async fn send_magic_link(&self, email: &str, invitation: &InvitationMetadata) -> Result<(), IdentityError>;
}

/// Supabase Auth over its REST API (`/auth/v1/*`)
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl SupabaseIdentity {
    pub fn new(config: &SupabaseConfig) -> Result<Self, IdentityError> {
        let base_url = config.url.clone().ok_or(IdentityError::NotConfigured)?;
        let anon_key = config.anon_key.clone().ok_or(IdentityError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            service_role_key: config.service_role_key.clone(),
        })
    }

    /// Supabase client when configured, otherwise a provider that refuses everything
    pub fn from_config(config: &SupabaseConfig) -> Arc<dyn IdentityProvider> {
        match Self::new(config) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                tracing::warn!("Identity provider disabled: {}", e);
                Arc::new(DisabledIdentity)
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn rejected(response: reqwest::Response) -> IdentityError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        IdentityError::Rejected(format!("{} {}", status, body))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_up(&self, account: &SignUp<'_>) -> Result<IdentityUser, IdentityError> {
        let response = self
            .client
            .post(self.url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": account.email,
                "password": account.password,
                "data": { "full_name": account.full_name },
            }))
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                // A session when email confirmation is off, the bare user otherwise
                let body: Value = response.json().await?;
                let user = body.get("user").cloned().unwrap_or(body);
                serde_json::from_value(user).map_err(|e| IdentityError::Rejected(e.to_string()))
            }
            422 => Err(IdentityError::AlreadyRegistered),
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        let response = self
            .client
            .post(self.url("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(response.json::<IdentitySession>().await?),
            400 | 401 => Err(IdentityError::InvalidCredentials),
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<IdentitySession, IdentityError> {
        let response = self
            .client
            .post(self.url("token?grant_type=refresh_token"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(response.json::<IdentitySession>().await?),
            400 | 401 => Err(IdentityError::InvalidToken),
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .put(self.url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "password": new_password }))
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(()),
            401 | 403 => Err(IdentityError::InvalidToken),
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn invite_user_by_email(&self, email: &str, invitation: &InvitationMetadata) -> Result<(), IdentityError> {
        let service_key = self.service_role_key.as_deref().ok_or(IdentityError::NotConfigured)?;

        let response = self
            .client
            .post(self.url("invite"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&json!({ "email": email, "data": invitation }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    async fn send_magic_link(&self, email: &str, invitation: &InvitationMetadata) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.url("otp"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "create_user": false, "data": invitation }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}

/// Used when no identity provider is configured (local development)
pub struct DisabledIdentity;

#[async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn sign_up(&self, _account: &SignUp<'_>) -> Result<IdentityUser, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn sign_in_with_password(&self, _email: &str, _password: &str) -> Result<IdentitySession, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<IdentitySession, IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn send_password_reset(&self, _email: &str) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn update_password(&self, _access_token: &str, _new_password: &str) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn invite_user_by_email(&self, _email: &str, _invitation: &InvitationMetadata) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }

    async fn send_magic_link(&self, _email: &str, _invitation: &InvitationMetadata) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_url_and_anon_key() {
        assert!(matches!(
            SupabaseIdentity::new(&SupabaseConfig::default()),
            Err(IdentityError::NotConfigured)
        ));

        let config = SupabaseConfig {
            url: Some("https://project.supabase.co/".to_string()),
            anon_key: Some("anon".to_string()),
            service_role_key: None,
        };
        let provider = SupabaseIdentity::new(&config).unwrap();
        assert_eq!(provider.url("invite"), "https://project.supabase.co/auth/v1/invite");
    }

    #[test]
    fn invitation_metadata_serializes_role_lower_case() {
        let invitation = InvitationMetadata {
            invited_to_org: Uuid::nil(),
            invited_role: Role::Facilitador,
            invited_by: None,
        };
        let value = serde_json::to_value(&invitation).unwrap();
        assert_eq!(value["invited_role"], "facilitador");
    }
}
