#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use futures::stream;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use oasis_api::auth::{mint_token, Claims};
use oasis_api::config::AppConfig;
use oasis_api::database::memory::demo;
use oasis_api::database::MemoryStore;
use oasis_api::services::chat::{ChatError, ChatMessage, ChatProvider, TextStream};
use oasis_api::services::crm::CrmStorage;
use oasis_api::services::identity::{
    IdentityError, IdentityProvider, IdentitySession, IdentityUser, InvitationMetadata, SignUp,
};
use oasis_api::services::superset::SupersetClient;
use oasis_api::{app, AppState};

// ---------------------------------------------------------------------------
// Spawned server (smoke tests)
// ---------------------------------------------------------------------------

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // The in-memory store keeps the smoke test independent of Postgres
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_oasis-api"));
        cmd.env("OASIS_API_PORT", port.to_string())
            .env("OASIS_STORE", "memory")
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK || resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

// ---------------------------------------------------------------------------
// In-process router (integration tests)
// ---------------------------------------------------------------------------

pub const LOGIN_PASSWORD: &str = "correcto";
pub const REFRESH_TOKEN: &str = "refresh";
pub const RECOVERY_TOKEN: &str = "recovery";

/// Accounts the fake provider already knows
const REGISTERED: &[&str] = &["ana.perez@oasis.cl", "carlos.soto@oasis.cl", "diego.munoz@oasis.cl"];

/// Identity provider that accepts one password and records invitations,
/// sign-ups and reset requests
#[derive(Default)]
pub struct FakeIdentity {
    pub invited: tokio::sync::Mutex<Vec<(String, InvitationMetadata)>>,
    pub signed_up: tokio::sync::Mutex<Vec<(Uuid, String)>>,
    pub resets: tokio::sync::Mutex<Vec<String>>,
}

fn owner_session(email: &str) -> Result<IdentitySession, IdentityError> {
    let config = AppConfig::development();
    let claims = Claims::new(demo::OWNER, Some(email.to_string()), &config.security);
    let token = mint_token(&claims, &config.security).map_err(|e| IdentityError::Rejected(e.to_string()))?;

    Ok(IdentitySession {
        access_token: token,
        refresh_token: Some(REFRESH_TOKEN.to_string()),
        expires_in: 3600,
        user: IdentityUser { id: demo::OWNER, email: Some(email.to_string()) },
    })
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, account: &SignUp<'_>) -> Result<IdentityUser, IdentityError> {
        if REGISTERED.contains(&account.email) {
            return Err(IdentityError::AlreadyRegistered);
        }
        let id = Uuid::new_v4();
        self.signed_up.lock().await.push((id, account.email.to_string()));
        Ok(IdentityUser { id, email: Some(account.email.to_string()) })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        if password != LOGIN_PASSWORD {
            return Err(IdentityError::InvalidCredentials);
        }
        owner_session(email)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<IdentitySession, IdentityError> {
        if refresh_token != REFRESH_TOKEN {
            return Err(IdentityError::InvalidToken);
        }
        owner_session("ana.perez@oasis.cl")
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.resets.lock().await.push(email.to_string());
        Ok(())
    }

    async fn update_password(&self, access_token: &str, _new_password: &str) -> Result<(), IdentityError> {
        if access_token == RECOVERY_TOKEN {
            Ok(())
        } else {
            Err(IdentityError::InvalidToken)
        }
    }

    async fn invite_user_by_email(&self, email: &str, invitation: &InvitationMetadata) -> Result<(), IdentityError> {
        self.invited.lock().await.push((email.to_string(), invitation.clone()));
        Ok(())
    }

    async fn send_magic_link(&self, _email: &str, _invitation: &InvitationMetadata) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// Chat provider that answers with two fixed chunks, or fails when asked to
pub struct EchoChat;

#[async_trait]
impl ChatProvider for EchoChat {
    async fn stream_reply(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<TextStream, ChatError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last == "fallar" {
            return Err(ChatError::Upstream("boom".to_string()));
        }
        let persona = if system_prompt.contains("coach") || system_prompt.contains("Coach") { "coach" } else { "mentor" };
        let chunks = vec![Ok(format!("[{}] ", persona)), Ok(last)];
        Ok(Box::pin(stream::iter(chunks)))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub identity: Arc<FakeIdentity>,
    pub config: AppConfig,
}

pub fn test_app() -> TestApp {
    test_app_with(AppConfig::development())
}

pub fn test_app_with(config: AppConfig) -> TestApp {
    let store = Arc::new(MemoryStore::demo());
    let identity = Arc::new(FakeIdentity::default());
    let superset = SupersetClient::new(&config.superset).expect("superset client");
    let crm = Arc::new(CrmStorage::in_memory(&config.crm));

    let state = AppState::new(config.clone(), store.clone(), identity.clone(), Arc::new(EchoChat), superset, crm);

    TestApp { router: app(state), store, identity, config }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }

    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    pub fn location(&self) -> Option<String> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok()).map(str::to_string)
    }
}

impl TestApp {
    pub fn token(&self, user_id: Uuid) -> String {
        mint_token(&Claims::new(user_id, None, &self.config.security), &self.config.security).expect("token")
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");

        TestResponse { status, headers, text: String::from_utf8_lossy(&bytes).into_owned() }
    }

    /// Authenticated request with an optional JSON body
    pub async fn call(&self, method: &str, uri: &str, user: Uuid, body: Option<Value>) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        self.send(with_body(builder, body)).await
    }

    pub async fn get(&self, uri: &str, user: Uuid) -> TestResponse {
        self.call("GET", uri, user, None).await
    }
}

pub fn with_body(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
