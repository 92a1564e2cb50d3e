//! Structured field extraction oracle

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentType, StructuredData};

/// Turns the raw text of a trade document into structured fields
///
/// Failures are reported as `Error::Extraction`.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract(&self, raw_text: &str, document_type: DocumentType) -> Result<StructuredData>;
}
