//! Supervisor review of a classified document

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ClassificationResult, StructuredData, SupervisorVerdict};
use crate::validation::review_gate;

/// Final review of the structured data and its classification
///
/// Failures are reported as `Error::Supervision`.
#[async_trait]
pub trait SupervisorProvider: Send + Sync {
    async fn review(
        &self,
        data: &StructuredData,
        classification: &ClassificationResult,
    ) -> Result<SupervisorVerdict>;
}

/// Supervisor that flags classifications below a confidence threshold
#[derive(Debug, Clone)]
pub struct ConfidenceGateSupervisor {
    threshold: f64,
}

impl ConfidenceGateSupervisor {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for ConfidenceGateSupervisor {
    fn default() -> Self {
        Self::new(0.95)
    }
}

#[async_trait]
impl SupervisorProvider for ConfidenceGateSupervisor {
    async fn review(
        &self,
        _data: &StructuredData,
        classification: &ClassificationResult,
    ) -> Result<SupervisorVerdict> {
        Ok(review_gate(classification.confidence, self.threshold))
    }
}
