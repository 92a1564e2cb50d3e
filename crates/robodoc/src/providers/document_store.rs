//! Document store trait for shipments, documents and stage results

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Document, DocumentField, DocumentStatus, DocumentType, Shipment};

/// Persistence for shipments and the documents under them
///
/// Implementations:
/// - `SqliteDocumentStore`: rusqlite database file
/// - `InMemoryDocumentStore`: DashMap, for tests and ephemeral runs
///
/// Every update refreshes `updated_at`. A document in a terminal status
/// cannot be moved to another status; attempts fail with
/// `Error::InvalidTransition`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a shipment and return its id
    async fn create_shipment(&self, reference: &str) -> Result<Uuid>;

    async fn get_shipment(&self, id: Uuid) -> Result<Option<Shipment>>;

    /// Create a document in `received` under an existing shipment
    async fn create_document(
        &self,
        shipment_id: Uuid,
        source_filename: &str,
        document_type: DocumentType,
    ) -> Result<Uuid>;

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// Documents of a shipment, oldest first
    async fn list_documents(&self, shipment_id: Uuid) -> Result<Vec<Document>>;

    async fn update_status(&self, id: Uuid, status: DocumentStatus) -> Result<()>;

    /// Persist one stage result
    async fn update_field(&self, id: Uuid, field: DocumentField) -> Result<()>;

    /// Move the document to `error` with a human-readable message
    async fn log_failure(&self, id: Uuid, message: &str) -> Result<()>;

    /// Get store name for logging
    fn name(&self) -> &str;
}
