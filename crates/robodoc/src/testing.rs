//! Deterministic doubles for the embedding model, the oracles and the store

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeChunk;
use crate::providers::{
    ClassificationProvider, DocumentStore, EmbeddingProvider, ExtractionProvider,
    SupervisorProvider,
};
use crate::storage::InMemoryDocumentStore;
use crate::types::{
    ClassificationResult, Document, DocumentField, DocumentStatus, DocumentType, Shipment,
    StructuredData, SupervisorVerdict,
};
use uuid::Uuid;

/// Bag-of-words embedder: each lowercase alphanumeric token adds weight to
/// one FNV-hashed bucket; vectors are L2-normalized.
pub struct HashEmbedder {
    dimensions: usize,
    batch_calls: AtomicUsize,
    query_delay: Option<Duration>,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            batch_calls: AtomicUsize::new(0),
            query_delay: None,
        }
    }

    /// Stall single-text embeddings; batch embedding stays immediate
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = token
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                    (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
                });
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent callers get a chance to race the build
        tokio::task::yield_now().await;
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash-embedder"
    }
}

/// Extraction oracle returning a fixed answer
pub struct ScriptedExtractor {
    answer: std::result::Result<StructuredData, String>,
    delay: Option<Duration>,
}

impl ScriptedExtractor {
    pub fn returning(data: StructuredData) -> Self {
        Self {
            answer: Ok(data),
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedExtractor {
    async fn extract(&self, _raw_text: &str, _document_type: DocumentType) -> Result<StructuredData> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.clone().map_err(Error::Extraction)
    }
}

/// Classification oracle returning a fixed answer and counting calls
pub struct ScriptedClassifier {
    answer: std::result::Result<ClassificationResult, String>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn returning(result: ClassificationResult) -> Self {
        Self {
            answer: Ok(result),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationProvider for ScriptedClassifier {
    async fn classify(
        &self,
        _description: &str,
        _context: &[KnowledgeChunk],
    ) -> Result<ClassificationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(Error::Classification)
    }
}

/// Supervisor that always fails with a transport error
pub struct UnreachableSupervisor;

#[async_trait]
impl SupervisorProvider for UnreachableSupervisor {
    async fn review(
        &self,
        _data: &StructuredData,
        _classification: &ClassificationResult,
    ) -> Result<SupervisorVerdict> {
        Err(Error::llm("connection refused"))
    }
}

/// In-memory store whose writes of one field always fail
pub struct FailingFieldStore {
    inner: InMemoryDocumentStore,
    field: &'static str,
    failures_logged: AtomicUsize,
}

impl FailingFieldStore {
    pub fn new(field: &'static str) -> Self {
        Self {
            inner: InMemoryDocumentStore::new(),
            field,
            failures_logged: AtomicUsize::new(0),
        }
    }

    pub fn failures_logged(&self) -> usize {
        self.failures_logged.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingFieldStore {
    async fn create_shipment(&self, reference: &str) -> Result<Uuid> {
        self.inner.create_shipment(reference).await
    }

    async fn get_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
        self.inner.get_shipment(id).await
    }

    async fn create_document(
        &self,
        shipment_id: Uuid,
        source_filename: &str,
        document_type: DocumentType,
    ) -> Result<Uuid> {
        self.inner
            .create_document(shipment_id, source_filename, document_type)
            .await
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        self.inner.get_document(id).await
    }

    async fn list_documents(&self, shipment_id: Uuid) -> Result<Vec<Document>> {
        self.inner.list_documents(shipment_id).await
    }

    async fn update_status(&self, id: Uuid, status: DocumentStatus) -> Result<()> {
        self.inner.update_status(id, status).await
    }

    async fn update_field(&self, id: Uuid, field: DocumentField) -> Result<()> {
        if field.name() == self.field {
            return Err(Error::store(format!("disk full writing {}", self.field)));
        }
        self.inner.update_field(id, field).await
    }

    async fn log_failure(&self, id: Uuid, message: &str) -> Result<()> {
        self.failures_logged.fetch_add(1, Ordering::SeqCst);
        self.inner.log_failure(id, message).await
    }

    fn name(&self) -> &str {
        "failing-field"
    }
}

/// Classification answer with the given confidence
pub fn classification(confidence: f64) -> ClassificationResult {
    ClassificationResult {
        hs_code: "8517.13".to_string(),
        description: "Smartphones".to_string(),
        confidence,
        reasoning: "Cellular handsets fall under heading 8517".to_string(),
        evidence_text: String::new(),
        sources: Vec::new(),
    }
}
