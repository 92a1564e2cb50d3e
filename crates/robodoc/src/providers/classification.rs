//! Tariff classification oracle

use async_trait::async_trait;

use crate::error::Result;
use crate::knowledge::KnowledgeChunk;
use crate::types::ClassificationResult;

/// Proposes an HS code for a product description
///
/// `context` holds the retrieved tariff chunks, most similar first.
/// Failures are reported as `Error::Classification`.
#[async_trait]
pub trait ClassificationProvider: Send + Sync {
    async fn classify(
        &self,
        description: &str,
        context: &[KnowledgeChunk],
    ) -> Result<ClassificationResult>;
}
