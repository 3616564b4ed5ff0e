//! Wiring of configured components.

use std::sync::Arc;

use anyhow::{Context, Result};
use lingua_model::{GenerationGateway, OpenAIClient, OpenAIConfig};
use lingua_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, IngestPipeline, OpenAIEmbeddingProvider,
    Retriever, SqliteVectorStore, VectorIndex,
};
use tracing::{debug, warn};

use crate::config::{EmbeddingProviderKind, LinguaConfig, require_api_key};

/// Builds indexes and gateways from a [`LinguaConfig`].
pub struct App {
    config: LinguaConfig,
    gateway: Option<Arc<dyn GenerationGateway>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl App {
    /// An app that builds its gateway from `config` on first use.
    pub fn new(config: LinguaConfig) -> Self {
        Self { config, gateway: None, embedder: None }
    }

    /// Use `gateway` instead of building an OpenAI client.
    pub fn with_gateway(mut self, gateway: Arc<dyn GenerationGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Use `embedder` instead of the configured provider.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &LinguaConfig {
        &self.config
    }

    fn embedder(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        if let Some(embedder) = &self.embedder {
            return Ok(embedder.clone());
        }
        let embedding = &self.config.embedding;
        match embedding.provider {
            EmbeddingProviderKind::Hashing => {
                let provider = match embedding.dimensions {
                    Some(dimensions) => HashingEmbeddingProvider::new(dimensions)?,
                    None => HashingEmbeddingProvider::default(),
                };
                Ok(Arc::new(provider))
            }
            EmbeddingProviderKind::OpenAI => {
                let mut provider =
                    OpenAIEmbeddingProvider::new(require_api_key("OpenAI embeddings")?)?
                        .with_timeout(embedding.timeout());
                if let Some(model) = &embedding.model {
                    provider = provider.with_model(model);
                }
                if let Some(dimensions) = embedding.dimensions {
                    provider = provider.with_dimensions(dimensions);
                }
                if let Some(base_url) = &embedding.base_url {
                    provider = provider.with_base_url(base_url);
                }
                Ok(Arc::new(provider))
            }
        }
    }

    /// Open (creating if needed) the configured collection.
    pub async fn open_index(&self) -> Result<Arc<VectorIndex>> {
        let path = &self.config.storage.path;
        let store = SqliteVectorStore::open(path)
            .await
            .with_context(|| format!("failed to open index at {}", path.display()))?;
        let index = VectorIndex::open(&self.config.rag.collection, self.embedder()?, Arc::new(store))
            .await?
            .with_batch_size(self.config.rag.embedding_batch_size);
        debug!(path = %path.display(), collection = %index.collection(), "index ready");
        Ok(Arc::new(index))
    }

    /// A retriever over the existing index, or an ungrounded one when there
    /// is no index yet or it cannot be opened.
    pub async fn retriever(&self) -> Retriever {
        let path = &self.config.storage.path;
        if !path.is_file() {
            warn!(path = %path.display(), "no index found, answers will not be grounded");
            return Retriever::new(None).with_top_k(self.config.rag.top_k);
        }
        let index = match self.open_index().await {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "index unavailable, answers will not be grounded");
                None
            }
        };
        Retriever::new(index).with_top_k(self.config.rag.top_k)
    }

    /// An ingestion pipeline writing to `index`.
    pub fn pipeline(&self, index: Arc<VectorIndex>) -> Result<IngestPipeline> {
        Ok(IngestPipeline::builder().config(self.config.rag.clone()).index(index).build()?)
    }

    /// The injected gateway, or an OpenAI client built from the config.
    ///
    /// Fails when `OPENAI_API_KEY` is not set.
    pub fn gateway(&self) -> Result<Arc<dyn GenerationGateway>> {
        if let Some(gateway) = &self.gateway {
            return Ok(gateway.clone());
        }
        let generation = &self.config.generation;
        let mut config = OpenAIConfig::new(require_api_key("generation")?, &generation.model)
            .with_timeout(generation.timeout())
            .with_idle_timeout(generation.idle_timeout());
        if let Some(base_url) = &generation.base_url {
            config = config.with_base_url(base_url);
        }
        Ok(Arc::new(OpenAIClient::new(config)?))
    }
}

/// Close the index if this is the last handle to it.
pub async fn close_index(index: Arc<VectorIndex>) -> Result<()> {
    if let Ok(index) = Arc::try_unwrap(index) {
        index.close().await?;
    }
    Ok(())
}
