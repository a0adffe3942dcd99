//! AI chat companion backed by a hosted LLM.
//!
//! The caller picks a persona ("coach" or "mentor"); the reply is streamed
//! back as plain text fragments.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::AiConfig;

const COACH_PROMPT: &str = "Eres 'OASIS Coach', un entrenador enfocado en la acción, el establecimiento de metas y la responsabilidad. Eres directo, motivador y haces preguntas poderosas para impulsar al usuario hacia sus objetivos. No das consejos directos, facilitas soluciones.";

const MENTOR_PROMPT: &str = "Eres 'OASIS Mentor', un guía sabio, empático y paciente. Te enfocas en el bienestar emocional, la escucha activa y el apoyo incondicional. Usas un tono cálido, validador y calmado. Tu objetivo es que el usuario se sienta escuchado y comprendido.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("{0}")]
    Invalid(String),

    #[error("AI provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider returned an error: {0}")]
    Upstream(String),
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Coach,
    Mentor,
}

impl ChatMode {
    /// "coach" selects the coach; anything else gets the mentor
    pub fn from_request(mode: Option<&str>) -> Self {
        match mode {
            Some("coach") => ChatMode::Coach,
            _ => ChatMode::Mentor,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            ChatMode::Coach => COACH_PROMPT,
            ChatMode::Mentor => MENTOR_PROMPT,
        }
    }
}

crate::string_enum! {
    pub enum ChatRole {
        User => "user",
        Assistant => "assistant",
        System => "system",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn stream_reply(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<TextStream, ChatError>;
}

pub struct ChatService {
    provider: Arc<dyn ChatProvider>,
}

impl ChatService {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    pub async fn reply(&self, request: &ChatRequest) -> Result<TextStream, ChatError> {
        if !request.messages.iter().any(|m| m.role == ChatRole::User) {
            return Err(ChatError::Invalid("At least one user message is required".to_string()));
        }

        let mode = ChatMode::from_request(request.mode.as_deref());
        tracing::debug!(?mode, messages = request.messages.len(), "Starting chat reply");
        self.provider.stream_reply(mode.system_prompt(), &request.messages).await
    }
}

/// Gemini `streamGenerateContent` over server-sent events
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Result<Self, ChatError> {
        let api_key = config.api_key.clone().ok_or(ChatError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AiConfig) -> Arc<dyn ChatProvider> {
        match Self::new(config) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                tracing::warn!("AI chat disabled: {}", e);
                Arc::new(DisabledChat)
            }
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn stream_reply(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<TextStream, ChatError> {
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request(system_prompt, messages))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Upstream(format!("{} {}", status, body)));
        }

        Ok(Box::pin(sse_text(response.bytes_stream())))
    }
}

/// Refuses every request; used when no API key is configured
pub struct DisabledChat;

#[async_trait]
impl ChatProvider for DisabledChat {
    async fn stream_reply(&self, _system_prompt: &str, _messages: &[ChatMessage]) -> Result<TextStream, ChatError> {
        Err(ChatError::NotConfigured)
    }
}

fn gemini_request(system_prompt: &str, messages: &[ChatMessage]) -> Value {
    let contents: Vec<Value> = messages
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
                ChatRole::System => return None,
            };
            Some(json!({ "role": role, "parts": [{ "text": m.content }] }))
        })
        .collect();

    json!({
        "systemInstruction": { "parts": [{ "text": system_prompt }] },
        "contents": contents,
    })
}

/// Text fragments of an SSE body. Events may be split across network chunks,
/// so bytes are buffered until a full line is available; whatever is left
/// when the body ends is parsed as a final line.
fn sse_text<S, B, E>(body: S) -> impl Stream<Item = Result<String, ChatError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    ChatError: From<E>,
{
    body.map(Some)
        .chain(stream::once(async { None }))
        .scan(Vec::new(), |buffer: &mut Vec<u8>, chunk| {
            let items = match chunk {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(bytes.as_ref());
                    parse_lines(drain_lines(buffer))
                }
                Some(Err(e)) => vec![Err(ChatError::from(e))],
                None => parse_lines(take_rest(buffer).into_iter().collect()),
            };
            futures::future::ready(Some(items))
        })
        .flat_map(stream::iter)
}

fn parse_lines(lines: Vec<String>) -> Vec<Result<String, ChatError>> {
    lines.iter().filter_map(|line| parse_sse_line(line)).collect()
}

/// Remove every complete line from `buffer`, leaving any partial tail
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let text = String::from_utf8_lossy(&line);
        lines.push(text.trim_end_matches(['\r', '\n']).to_string());
    }
    lines
}

/// Unterminated last line, if the body did not end with a newline
fn take_rest(buffer: &mut Vec<u8>) -> Option<String> {
    let rest = std::mem::take(buffer);
    let text = String::from_utf8_lossy(&rest);
    let line = text.trim_end_matches(['\r', '\n']);
    (!line.is_empty()).then(|| line.to_string())
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Text carried by one SSE line, if any
fn parse_sse_line(line: &str) -> Option<Result<String, ChatError>> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let chunk: GenerateChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(ChatError::Upstream(format!("Malformed stream event: {}", e)))),
    };
    if let Some(error) = chunk.error {
        return Some(Err(ChatError::Upstream(error.to_string())));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect();

    (!text.is_empty()).then_some(Ok(text))
}
