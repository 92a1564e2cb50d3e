//! Stage result types persisted on a document

use serde::{Deserialize, Serialize};

/// Tariff classification proposed for a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Proposed HS code
    pub hs_code: String,
    /// Tariff heading description
    pub description: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub reasoning: String,
    /// Tariff text supporting the proposal
    pub evidence_text: String,
    /// Retrieved tariff chunks, closest match first
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Outcome of the business-rule (pre-flight) checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightReport {
    pub checks_passed: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl PreflightReport {
    /// A passing report with no findings
    pub fn passed() -> Self {
        Self {
            checks_passed: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a rule violation
    pub fn fail(&mut self, error: impl Into<String>) {
        self.checks_passed = false;
        self.errors.push(error.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Final review disposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Approved,
    NeedsReview,
}

/// Supervisor review of the combined extraction and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorVerdict {
    pub status: VerdictStatus,
    pub warnings: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
}

impl SupervisorVerdict {
    pub fn is_approved(&self) -> bool {
        self.status == VerdictStatus::Approved
    }
}
