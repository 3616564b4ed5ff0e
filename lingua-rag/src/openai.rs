//! Embeddings from the OpenAI API or any server that speaks its
//! `/embeddings` protocol (vLLM, Ollama, LiteLLM, ...).
//!
//! Available with the `openai` feature.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_DIMENSIONS: usize = 1536;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on inputs per request accepted by the API.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Remote [`EmbeddingProvider`].
///
/// Defaults to `text-embedding-3-small` (1536 dimensions) with a 60 second
/// timeout per request. A failed request is returned as
/// [`RagError::EmbeddingError`] and never retried.
///
/// ```rust,ignore
/// use lingua_rag::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new(std::env::var("OPENAI_API_KEY")?)?
///     .with_base_url("http://localhost:11434/v1")
///     .with_model("nomic-embed-text")
///     .with_dimensions(768);
/// ```
pub struct OpenAIEmbeddingProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimensions: usize,
    truncate_to: Option<usize>,
    timeout: Duration,
}

impl OpenAIEmbeddingProvider {
    /// A provider for the public OpenAI API.
    ///
    /// # Errors
    ///
    /// Fails on an empty key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(failure("API key must not be empty"));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            endpoint: endpoint(OPENAI_BASE_URL),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            truncate_to: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Use `model` instead of `text-embedding-3-small`.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the service for vectors of `dimensions` entries. The collection
    /// is created with the same size.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self.truncate_to = Some(dimensions);
        self
    }

    /// Use an OpenAI-compatible server rooted at `base_url`.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.endpoint = endpoint(base_url.as_ref());
        self
    }

    /// Limit on one request, 60 seconds by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, input: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsRequest { model: &self.model, input, dimensions: self.truncate_to };
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %self.endpoint, error = %e, "embeddings request failed");
                failure(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(endpoint = %self.endpoint, %status, "embeddings request rejected");
            return Err(failure(format!("API returned {status}: {}", error_detail(body))));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("malformed response: {e}")))?;
        in_input_order(parsed.data, input.len(), self.dimensions)
    }
}

fn endpoint(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

fn failure(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: "openai".to_string(), message: message.into() }
}

/// The API's own error message when the body carries one.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorBody>(&body).map(|e| e.error.message).unwrap_or(body)
}

/// Reorder vectors by their `index` and check that every input got exactly
/// one vector of the expected size.
fn in_input_order(
    mut data: Vec<EmbeddingItem>,
    inputs: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    data.sort_by_key(|item| item.index);
    let complete = data.len() == inputs && data.iter().enumerate().all(|(i, item)| item.index == i);
    if !complete {
        return Err(failure(format!("expected {inputs} embeddings, got {}", data.len())));
    }
    if let Some(item) = data.iter().find(|item| item.embedding.len() != dimensions) {
        return Err(failure(format!(
            "embedding has {} dimensions, expected {dimensions}",
            item.embedding.len()
        )));
    }
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| failure("API returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for input in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            debug!(model = %self.model, inputs = input.len(), "requesting embeddings");
            vectors.extend(self.request(input).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
