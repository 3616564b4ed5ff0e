//! `lingua.toml` configuration.
//!
//! Every section is optional; a missing file means all defaults. The API key
//! is never read from the file, only from `OPENAI_API_KEY`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use lingua_rag::RagConfig;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "lingua.toml";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Contents of `lingua.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinguaConfig {
    /// Chunking, filtering and retrieval settings.
    pub rag: RagConfig,
    /// Where the index lives.
    pub storage: StorageConfig,
    /// How passages and queries are embedded.
    pub embedding: EmbeddingConfig,
    /// The chat model.
    pub generation: GenerationConfig,
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database holding the index.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("./lingua_index.db") }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Remote OpenAI-compatible embeddings.
    #[default]
    OpenAI,
    /// Local feature hashing; needs no network or key.
    Hashing,
}

/// `[embedding]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Model name; the provider's default when unset.
    pub model: Option<String>,
    /// Vector size; the provider's default when unset.
    pub dimensions: Option<usize>,
    /// OpenAI-compatible server to use instead of the public API.
    pub base_url: Option<String>,
    /// Limit on one embeddings request.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAI,
            model: None,
            dimensions: None,
            base_url: None,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// `timeout_secs` as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[generation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Chat model name.
    pub model: String,
    /// OpenAI-compatible server to use instead of the public API.
    pub base_url: Option<String>,
    /// Limit on waiting for the first response (or a whole structured response).
    pub timeout_secs: u64,
    /// Limit on the gap between two streamed segments.
    pub idle_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: None,
            timeout_secs: 120,
            idle_timeout_secs: 30,
        }
    }
}

impl GenerationConfig {
    /// `timeout_secs` as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `idle_timeout_secs` as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl LinguaConfig {
    /// Load from `path`, or from `./lingua.toml` when it exists, or defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero sizes and timeouts and an empty model name.
    pub fn validate(&self) -> Result<()> {
        self.rag.validate()?;
        if self.embedding.dimensions == Some(0) {
            bail!("embedding.dimensions must be greater than zero");
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be greater than zero");
        }
        if self.generation.model.trim().is_empty() {
            bail!("generation.model must not be empty");
        }
        if self.generation.timeout_secs == 0 || self.generation.idle_timeout_secs == 0 {
            bail!("generation timeouts must be greater than zero");
        }
        Ok(())
    }
}

/// The API key from the environment, if set and non-empty.
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_VAR).ok().filter(|key| !key.trim().is_empty())
}

/// The API key, or an error naming what needed it.
pub fn require_api_key(purpose: &str) -> Result<String> {
    api_key().with_context(|| format!("{API_KEY_VAR} must be set to use {purpose}"))
}
