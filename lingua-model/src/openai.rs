//! OpenAI-compatible chat completions client.
//!
//! This module is only available when the `openai` feature is enabled.
//!
//! Chat answers are streamed over server-sent events. Each stream segment
//! must arrive within the idle timeout, and a [`CancellationToken`] ends the
//! stream early and drops the connection. Study material is requested in
//! strict `json_schema` mode and validated before it is returned.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{ModelError, Result};
use crate::gateway::{ChatRequest, GenerationGateway, StudyRequest, TextStream};
use crate::message::Message;
use crate::study::{SCHEMA_NAME, StudyMaterial};

/// The default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// The default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for [`OpenAIClient`].
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Bearer token for the API.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Limit for a whole non-streamed request, and for the response headers
    /// of a streamed one.
    pub timeout: Duration,
    /// Limit between two consecutive stream segments.
    pub idle_timeout: Duration,
}

impl OpenAIConfig {
    /// Configuration for the public OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            idle_timeout: Duration::from_secs(30),
        }
    }

    /// Configuration for an OpenAI-compatible API.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(api_key, model).with_base_url(base_url)
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-segment idle timeout for streamed answers.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

/// [`GenerationGateway`] backed by the chat completions endpoint.
pub struct OpenAIClient {
    http: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the API key or model is empty.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }
        if config.model.trim().is_empty() {
            return Err(ModelError::Config("model must not be empty".into()));
        }
        Ok(Self { http: reqwest::Client::new(), config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ModelError {
        error!(model = %self.config.model, error = %e, "request failed");
        if e.is_timeout() {
            ModelError::Timeout(self.config.timeout)
        } else {
            ModelError::Request(e.to_string())
        }
    }

    /// Turn a non-success response into [`ModelError::Api`].
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        error!(status = status.as_u16(), message = %message, "generation service returned an error");
        Err(ModelError::Api { status: status.as_u16(), message })
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Server-sent events ─────────────────────────────────────────────

/// One decoded server-sent event.
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Incremental server-sent events decoder. Bytes may be split anywhere,
/// including inside a UTF-8 sequence.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Dispatch whatever is pending when the connection closes.
    fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim_end_matches(['\n', '\r']);
        if !rest.is_empty() {
            if let Some(event) = self.line(rest) {
                return Some(event);
            }
        }
        self.line("")
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(if data == "[DONE]" { SseEvent::Done } else { SseEvent::Data(data) });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        if field == "data" {
            self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        None
    }
}

/// Text carried by one streamed chunk, if any.
fn delta_text(data: &str) -> Result<Option<String>> {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(data) {
        return Err(ModelError::Stream(error.error.message));
    }
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| ModelError::Stream(format!("undecodable stream segment: {e}")))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty()))
}

// ── GenerationGateway implementation ───────────────────────────────

#[async_trait]
impl GenerationGateway for OpenAIClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<TextStream> {
        let messages = request.messages();
        debug!(model = %self.config.model, messages = messages.len(), "starting chat stream");

        let body = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            stream: true,
            response_format: None,
        };
        let send = self.http.post(self.endpoint()).bearer_auth(&self.config.api_key).json(&body).send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ModelError::Cancelled),
            sent = tokio::time::timeout(self.config.timeout, send) => match sent {
                Err(_) => return Err(ModelError::Timeout(self.config.timeout)),
                Ok(result) => result.map_err(|e| self.map_send_error(e))?,
            },
        };
        let response = Self::check_status(response).await?;

        let idle = self.config.idle_timeout;
        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::default();
            let mut done = false;

            while !done {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ModelError::Cancelled),
                    next = tokio::time::timeout(idle, bytes.next()) => {
                        next.map_err(|_| ModelError::Timeout(idle))
                    }
                }?;

                let events = match next {
                    Some(chunk) => {
                        let chunk = chunk.map_err(|e| ModelError::Stream(e.to_string()))?;
                        decoder.push(&chunk)
                    }
                    None => {
                        done = true;
                        decoder.finish().into_iter().collect()
                    }
                };

                for event in events {
                    match event {
                        SseEvent::Done => {
                            done = true;
                            break;
                        }
                        SseEvent::Data(data) => {
                            if let Some(text) = delta_text(&data)? {
                                yield text;
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn generate_study_material(&self, request: StudyRequest) -> Result<StudyMaterial> {
        let messages = request.messages();
        debug!(model = %self.config.model, "requesting study material");

        let body = CompletionRequest {
            model: &self.config.model,
            messages: &messages,
            stream: false,
            response_format: Some(serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": SCHEMA_NAME,
                    "schema": StudyMaterial::json_schema(),
                    "strict": true,
                },
            })),
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let response = Self::check_status(response).await?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Schema(format!("undecodable completion: {e}")))?;
        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| ModelError::Schema("completion has no choices".into()))?;

        if let Some(refusal) = message.refusal {
            return Err(ModelError::Schema(format!("model refused: {refusal}")));
        }
        let content =
            message.content.ok_or_else(|| ModelError::Schema("completion has no content".into()))?;

        let material = StudyMaterial::from_json(&content)?;
        info!(
            model = %self.config.model,
            flashcards = material.flashcards.len(),
            exercises = material.exercises.len(),
            "generated study material"
        );
        Ok(material)
    }
}
