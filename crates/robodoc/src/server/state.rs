//! Application state for the RoboDoc server

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::generation::OllamaClient;
use crate::knowledge::KnowledgeIndex;
use crate::processing::{DocumentPipeline, TariffClassifier};
use crate::providers::{
    ConfidenceGateSupervisor, DocumentStore, OllamaClassifier, OllamaEmbedder, OllamaExtractor,
    PdfTextExtractor,
};
use crate::storage::SqliteDocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Pipeline, which also owns the store and the knowledge index
    pipeline: Arc<DocumentPipeline>,
}

impl AppState {
    /// Create application state backed by SQLite and Ollama
    pub async fn new(config: AppConfig) -> Result<Self> {
        tracing::info!("Initializing RoboDoc application state...");

        let store = Arc::new(SqliteDocumentStore::new(&config.storage.database_path)?);
        tracing::info!("Document store opened at {}", config.storage.database_path.display());

        let ollama = Arc::new(OllamaClient::new(&config.llm)?);
        tracing::info!(
            "Ollama client initialized (embeddings: {}, generation: {})",
            config.llm.embed_model,
            ollama.generate_model()
        );

        let embedder = Arc::new(OllamaEmbedder::from_client(
            ollama.clone(),
            config.embeddings.dimensions,
            config.llm.embed_model.clone(),
        ));
        let index = Arc::new(KnowledgeIndex::new(&config.knowledge, embedder));

        let pipeline = DocumentPipeline::new(
            store,
            Arc::new(PdfTextExtractor::new()),
            Arc::new(OllamaExtractor::from_client(ollama.clone())),
            TariffClassifier::new(
                index,
                Arc::new(OllamaClassifier::from_client(ollama)),
                config.knowledge.top_k,
            ),
            Arc::new(ConfidenceGateSupervisor::new(config.review.confidence_threshold)),
            &config,
        );

        Ok(Self::from_parts(config, Arc::new(pipeline)))
    }

    /// Assemble state from an already built pipeline
    pub fn from_parts(config: AppConfig, pipeline: Arc<DocumentPipeline>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pipeline }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn pipeline(&self) -> &Arc<DocumentPipeline> {
        &self.inner.pipeline
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.inner.pipeline.store()
    }

    pub fn knowledge_index(&self) -> &Arc<KnowledgeIndex> {
        self.inner.pipeline.classifier().index()
    }
}
