//! robodoc: trade-compliance document pipeline
//!
//! Commercial invoices are pushed through a fixed sequence of stages: text
//! extraction, structured field extraction, retrieval-augmented tariff
//! classification, business-rule validation and a final review gate.
//! Classification is backed by a flat nearest-neighbor index over the tariff
//! schedule, built once and persisted to disk.

pub mod config;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod processing;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use knowledge::{KnowledgeChunk, KnowledgeIndex};
pub use processing::{DocumentPipeline, SourceFile};
pub use types::{
    ClassificationResult, Document, DocumentStatus, DocumentType, PreflightReport, Shipment,
    StructuredData, SupervisorVerdict, VerdictStatus,
};
pub use validation::RuleValidator;
