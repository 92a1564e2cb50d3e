//! Error types for the document pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
///
/// The first five variants are the fatal stage categories: when one of them
/// escapes a stage, the document is moved to `error` with the rendered
/// message attached.
#[derive(Debug, Error)]
pub enum Error {
    /// Source file missing/unreadable, or no text could be extracted
    #[error("Input error: {0}")]
    Input(String),

    /// Extraction oracle failed or returned unusable data
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Classification failed (oracle, empty context, malformed output)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Tariff knowledge base could not be built or loaded
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    /// Supervisor review failed
    #[error("Supervision error: {0}")]
    Supervision(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Shipment not found
    #[error("Shipment not found: {0}")]
    ShipmentNotFound(String),

    /// Attempt to move a document out of a terminal status
    #[error("Invalid status transition for document {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document store error
    #[error("Store error: {0}")]
    Store(String),

    /// Ollama/LLM transport error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create a classification error
    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification(message.into())
    }

    /// Create a knowledge base error
    pub fn knowledge_base(message: impl Into<String>) -> Self {
        Self::KnowledgeBase(message.into())
    }

    /// Create a supervision error
    pub fn supervision(message: impl Into<String>) -> Self {
        Self::Supervision(message.into())
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is one of the pipeline's fatal stage categories
    pub fn is_stage_failure(&self) -> bool {
        matches!(
            self,
            Self::Input(_)
                | Self::Extraction(_)
                | Self::Classification(_)
                | Self::KnowledgeBase(_)
                | Self::Supervision(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Input(_) => (StatusCode::BAD_REQUEST, "input_error"),
            Error::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_error"),
            Error::Classification(_) => (StatusCode::UNPROCESSABLE_ENTITY, "classification_error"),
            Error::KnowledgeBase(_) => (StatusCode::SERVICE_UNAVAILABLE, "knowledge_base_error"),
            Error::Supervision(_) => (StatusCode::UNPROCESSABLE_ENTITY, "supervision_error"),
            Error::DocumentNotFound(_) | Error::ShipmentNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            Error::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            Error::Config(_) => (StatusCode::BAD_REQUEST, "config_error"),
            Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            Error::Llm(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error"),
            Error::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
