//! Document and shipment types with processing status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::invoice::StructuredData;
use super::results::{ClassificationResult, PreflightReport, SupervisorVerdict};

/// Trade document types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    CommercialInvoice,
    PackingList,
    BillOfLading,
    CertificateOfOrigin,
    InsuranceCertificate,
    ApprovalDocument,
    LandWaybill,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 8] = [
        Self::CommercialInvoice,
        Self::PackingList,
        Self::BillOfLading,
        Self::CertificateOfOrigin,
        Self::InsuranceCertificate,
        Self::ApprovalDocument,
        Self::LandWaybill,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommercialInvoice => "commercial_invoice",
            Self::PackingList => "packing_list",
            Self::BillOfLading => "bill_of_lading",
            Self::CertificateOfOrigin => "certificate_of_origin",
            Self::InsuranceCertificate => "insurance_certificate",
            Self::ApprovalDocument => "approval_document",
            Self::LandWaybill => "land_waybill",
            Self::Other => "other",
        }
    }

    /// Human-readable name, used in extraction prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CommercialInvoice => "Commercial Invoice",
            Self::PackingList => "Packing List",
            Self::BillOfLading => "Bill of Lading",
            Self::CertificateOfOrigin => "Certificate of Origin",
            Self::InsuranceCertificate => "Insurance Certificate",
            Self::ApprovalDocument => "Approval Document",
            Self::LandWaybill => "Land Waybill",
            Self::Other => "Other",
        }
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::CommercialInvoice
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown document type: {}", s))
    }
}

/// Processing status of a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Received,
    Processing,
    Completed,
    NeedsReview,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::NeedsReview => "needs_review",
            Self::Error => "error",
        }
    }

    /// Terminal statuses are never left once reached
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::NeedsReview | Self::Error)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "needs_review" => Ok(Self::NeedsReview),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// A group of documents belonging to one import/export operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    /// Free-form reference (e.g. a booking or file number)
    pub reference: String,
    pub created_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            created_at: Utc::now(),
        }
    }
}

/// One uploaded file under processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub shipment_id: Uuid,
    /// Original filename as uploaded
    pub source_filename: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    /// Raw text, set once extraction succeeds
    pub raw_text: Option<String>,
    pub structured_data: Option<StructuredData>,
    pub classification: Option<ClassificationResult>,
    pub preflight: Option<PreflightReport>,
    pub supervisor_verdict: Option<SupervisorVerdict>,
    /// Human-readable failure message when status is `error`
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document in `received` status
    pub fn new(shipment_id: Uuid, source_filename: impl Into<String>, document_type: DocumentType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            shipment_id,
            source_filename: source_filename.into(),
            document_type,
            status: DocumentStatus::Received,
            raw_text: None,
            structured_data: None,
            classification: None,
            preflight: None,
            supervisor_verdict: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a stage result to this document
    pub fn apply(&mut self, field: DocumentField) {
        match field {
            DocumentField::RawText(text) => self.raw_text = Some(text),
            DocumentField::StructuredData(data) => self.structured_data = Some(data),
            DocumentField::Classification(result) => self.classification = Some(result),
            DocumentField::Preflight(report) => self.preflight = Some(report),
            DocumentField::SupervisorVerdict(verdict) => self.supervisor_verdict = Some(verdict),
        }
        self.updated_at = Utc::now();
    }
}

/// A stage result written to a document
#[derive(Debug, Clone)]
pub enum DocumentField {
    RawText(String),
    StructuredData(StructuredData),
    Classification(ClassificationResult),
    Preflight(PreflightReport),
    SupervisorVerdict(SupervisorVerdict),
}

impl DocumentField {
    /// Column/field name, used in logs and by the SQLite store
    pub fn name(&self) -> &'static str {
        match self {
            Self::RawText(_) => "raw_text",
            Self::StructuredData(_) => "structured_data",
            Self::Classification(_) => "classification",
            Self::Preflight(_) => "preflight",
            Self::SupervisorVerdict(_) => "supervisor_verdict",
        }
    }
}
