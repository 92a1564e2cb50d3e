//! Stage orchestrator driving one document through the pipeline

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::providers::{DocumentStore, ExtractionProvider, SupervisorProvider, TextExtractor};
use crate::types::{
    ClassificationResult, Document, DocumentField, DocumentStatus, StructuredData,
};
use crate::validation::RuleValidator;

use super::classifier::TariffClassifier;
use super::source::SourceFile;
use super::stage::{bounded, Stage, StageOutcome};

/// Unwrap a `Continue` value or return the halt disposition
macro_rules! advance {
    ($outcome:expr) => {
        match $outcome {
            StageOutcome::Continue(value) => value,
            StageOutcome::Halt(status) => return Ok(status),
        }
    };
}

/// Runs extract, structure, classify, validate, supervise and finalize for
/// one document, persisting each stage's result before the next begins.
pub struct DocumentPipeline {
    store: Arc<dyn DocumentStore>,
    text_extractor: Arc<dyn TextExtractor>,
    extractor: Arc<dyn ExtractionProvider>,
    classifier: TariffClassifier,
    supervisor: Arc<dyn SupervisorProvider>,
    validator: RuleValidator,
    oracle_timeout: Duration,
}

impl DocumentPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        text_extractor: Arc<dyn TextExtractor>,
        extractor: Arc<dyn ExtractionProvider>,
        classifier: TariffClassifier,
        supervisor: Arc<dyn SupervisorProvider>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            text_extractor,
            extractor,
            classifier,
            supervisor,
            validator: RuleValidator::new(config.review.amount_tolerance),
            oracle_timeout: Duration::from_secs(config.processing.oracle_timeout_secs),
        }
    }

    /// Override the per-oracle timeout
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn classifier(&self) -> &TariffClassifier {
        &self.classifier
    }

    /// Process a document on its own task
    pub fn spawn(self: Arc<Self>, doc_id: Uuid, source: SourceFile) -> JoinHandle<Result<DocumentStatus>> {
        tokio::spawn(async move {
            let result = self.process(doc_id, source).await;
            if let Err(e) = &result {
                tracing::error!("Document {}: processing aborted: {}", doc_id, e);
            }
            result
        })
    }

    /// Drive a document to a terminal status
    ///
    /// Stage failures are recorded on the document and reported as
    /// `Ok(DocumentStatus::Error)`. `Err` is returned only when the store
    /// itself cannot be updated.
    pub async fn process(&self, doc_id: Uuid, source: SourceFile) -> Result<DocumentStatus> {
        let start = Instant::now();
        let document = self
            .store
            .get_document(doc_id)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(doc_id.to_string()))?;

        self.store.update_status(doc_id, DocumentStatus::Processing).await?;
        tracing::info!(
            "Document {}: processing '{}' as {}",
            doc_id,
            document.source_filename,
            document.document_type
        );

        match self.run_stages(&document, &source).await {
            Ok(status) => {
                self.store.update_status(doc_id, status).await?;
                tracing::info!(
                    "Document {}: finished as {} in {:.1}s",
                    doc_id,
                    status,
                    start.elapsed().as_secs_f64()
                );
                Ok(status)
            }
            Err(e) if e.is_stage_failure() => {
                tracing::error!("Document {}: {}", doc_id, e);
                self.store.log_failure(doc_id, &e.to_string()).await?;
                Ok(DocumentStatus::Error)
            }
            Err(e) => {
                tracing::error!("Document {}: {}", doc_id, e);
                if let Err(log_err) = self.store.log_failure(doc_id, &e.to_string()).await {
                    tracing::warn!("Document {}: failed to record failure: {}", doc_id, log_err);
                }
                Err(e)
            }
        }
    }

    async fn run_stages(&self, document: &Document, source: &SourceFile) -> Result<DocumentStatus> {
        let id = document.id;

        let raw_text = advance!(self.extract_text(source).await?);
        self.persist(id, Stage::Extract, DocumentField::RawText(raw_text.clone())).await?;

        let data = advance!(self.structure(document, &raw_text).await?);
        self.persist(id, Stage::Structure, DocumentField::StructuredData(data.clone())).await?;

        let classification = advance!(self.classify(&data).await?);
        self.persist(id, Stage::Classify, DocumentField::Classification(classification.clone()))
            .await?;

        advance!(self.validate(document, &data).await?);

        let verdict = bounded(
            Stage::Supervise,
            self.oracle_timeout,
            self.supervisor.review(&data, &classification),
        )
        .await?;
        let approved = verdict.is_approved();
        self.persist(id, Stage::Supervise, DocumentField::SupervisorVerdict(verdict)).await?;

        let status = if approved {
            DocumentStatus::Completed
        } else {
            tracing::warn!("Document {}: supervisor flagged the classification for review", id);
            DocumentStatus::NeedsReview
        };
        tracing::info!("Document {}: stage {} -> {}", id, Stage::Finalize, status);
        Ok(status)
    }

    async fn extract_text(&self, source: &SourceFile) -> Result<StageOutcome<String>> {
        let text = self
            .text_extractor
            .extract_text(source.path())
            .await
            .map_err(|e| Stage::Extract.categorize(e))?;

        if text.trim().is_empty() {
            return Err(Error::input("No text could be extracted from the document"));
        }
        Ok(StageOutcome::Continue(text))
    }

    async fn structure(&self, document: &Document, raw_text: &str) -> Result<StageOutcome<StructuredData>> {
        let data = bounded(
            Stage::Structure,
            self.oracle_timeout,
            self.extractor.extract(raw_text, document.document_type),
        )
        .await?;

        if data.is_empty() {
            return Err(Error::extraction("No structured data found in the document"));
        }
        Ok(StageOutcome::Continue(data))
    }

    async fn classify(&self, data: &StructuredData) -> Result<StageOutcome<ClassificationResult>> {
        let description = data.product_description();
        let result = self
            .classifier
            .classify(&description, self.oracle_timeout)
            .await
            .map_err(|e| Stage::Classify.categorize(e))?;
        Ok(StageOutcome::Continue(result))
    }

    async fn validate(&self, document: &Document, data: &StructuredData) -> Result<StageOutcome<()>> {
        let report = self.validator.validate(data, document.document_type);
        let passed = report.checks_passed;
        if !passed {
            tracing::warn!(
                "Document {}: pre-flight failed with {} error(s): {}",
                document.id,
                report.errors.len(),
                report.errors.join("; ")
            );
        }
        self.persist(document.id, Stage::Validate, DocumentField::Preflight(report)).await?;

        if passed {
            Ok(StageOutcome::Continue(()))
        } else {
            Ok(StageOutcome::Halt(DocumentStatus::NeedsReview))
        }
    }

    async fn persist(&self, id: Uuid, stage: Stage, field: DocumentField) -> Result<()> {
        let name = field.name();
        self.store.update_field(id, field).await?;
        tracing::info!("Document {}: stage {} complete, {} saved", id, stage, name);
        Ok(())
    }
}
