//! Pipeline stages and their outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::DocumentStatus;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Structure,
    Classify,
    Validate,
    Supervise,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Structure => "structure",
            Self::Classify => "classify",
            Self::Validate => "validate",
            Self::Supervise => "supervise",
            Self::Finalize => "finalize",
        }
    }

    /// Error of this stage's failure category
    pub fn error(&self, message: impl Into<String>) -> Error {
        match self {
            Self::Extract => Error::input(message),
            Self::Structure => Error::extraction(message),
            Self::Classify => Error::classification(message),
            Self::Supervise => Error::supervision(message),
            Self::Validate | Self::Finalize => Error::internal(message),
        }
    }

    /// Keep stage-category errors; fold anything else into this stage's category
    pub fn categorize(&self, error: Error) -> Error {
        if error.is_stage_failure() {
            error
        } else {
            self.error(error.to_string())
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a stage that did not fail
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// Proceed to the next stage with this value
    Continue(T),
    /// Stop with a terminal disposition
    Halt(DocumentStatus),
}

/// Run one oracle call under `limit`, mapping failures to `stage`'s category
pub async fn bounded<T, F>(stage: Stage, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|e| stage.categorize(e)),
        Err(_) => Err(stage.error(format!(
            "oracle call timed out after {:.1}s",
            limit.as_secs_f64()
        ))),
    }
}
