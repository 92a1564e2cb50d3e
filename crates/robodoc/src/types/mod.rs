//! Core types for documents, extracted invoice data and stage results

pub mod document;
pub mod invoice;
pub mod results;

pub use document::{Document, DocumentField, DocumentStatus, DocumentType, Shipment};
pub use invoice::{FieldValue, LineItem, StructuredData};
pub use results::{ClassificationResult, PreflightReport, SupervisorVerdict, VerdictStatus};
