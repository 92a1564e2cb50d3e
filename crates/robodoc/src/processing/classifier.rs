//! Retrieval-augmented tariff classification

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeIndex;
use crate::providers::ClassificationProvider;
use crate::types::ClassificationResult;

use super::stage::{bounded, Stage};

/// Retrieves tariff context for a description and asks the oracle for a code
pub struct TariffClassifier {
    index: Arc<KnowledgeIndex>,
    oracle: Arc<dyn ClassificationProvider>,
    top_k: usize,
}

impl TariffClassifier {
    pub fn new(index: Arc<KnowledgeIndex>, oracle: Arc<dyn ClassificationProvider>, top_k: usize) -> Self {
        Self {
            index,
            oracle,
            top_k,
        }
    }

    pub fn index(&self) -> &Arc<KnowledgeIndex> {
        &self.index
    }

    /// Classify `description`, bounding the query embedding and the oracle
    /// call by `timeout` each
    ///
    /// An empty description fails before retrieval. Evidence defaults to the
    /// most similar chunk when the oracle gives none.
    pub async fn classify(&self, description: &str, timeout: Duration) -> Result<ClassificationResult> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::classification(
                "No product description available to classify",
            ));
        }

        // Index build is bounded by the transport timeout of each embedding request
        self.index.ensure_ready().await?;
        let context = bounded(
            Stage::Classify,
            timeout,
            self.index.query(description, self.top_k),
        )
        .await?;
        let Some(closest) = context.first() else {
            return Err(Error::classification("Tariff retrieval returned no context"));
        };
        tracing::debug!("Retrieved {} tariff chunks for classification", context.len());

        let mut result = bounded(
            Stage::Classify,
            timeout,
            self.oracle.classify(description, &context),
        )
        .await?;

        result.hs_code = result.hs_code.trim().to_string();
        if result.hs_code.is_empty() {
            return Err(Error::classification("Oracle returned an empty HS code"));
        }
        if !result.confidence.is_finite() || !(0.0..=1.0).contains(&result.confidence) {
            return Err(Error::classification(format!(
                "Oracle returned confidence {} outside [0, 1]",
                result.confidence
            )));
        }

        if result.evidence_text.trim().is_empty() {
            result.evidence_text = closest.text.clone();
        }
        result.sources = context.into_iter().map(|chunk| chunk.text).collect();

        Ok(result)
    }
}
