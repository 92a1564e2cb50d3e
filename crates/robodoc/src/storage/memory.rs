//! In-memory document store

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::DocumentStore;
use crate::types::{Document, DocumentField, DocumentStatus, DocumentType, Shipment};

use super::check_transition;

/// Document store held entirely in memory; contents are lost on drop
#[derive(Default)]
pub struct InMemoryDocumentStore {
    shipments: DashMap<Uuid, Shipment>,
    documents: DashMap<Uuid, Document>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_document<T>(&self, id: Uuid, op: impl FnOnce(&mut Document) -> Result<T>) -> Result<T> {
        let mut entry = self
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        op(entry.value_mut())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_shipment(&self, reference: &str) -> Result<Uuid> {
        let shipment = Shipment::new(reference);
        let id = shipment.id;
        self.shipments.insert(id, shipment);
        Ok(id)
    }

    async fn get_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
        Ok(self.shipments.get(&id).map(|s| s.value().clone()))
    }

    async fn create_document(
        &self,
        shipment_id: Uuid,
        source_filename: &str,
        document_type: DocumentType,
    ) -> Result<Uuid> {
        if !self.shipments.contains_key(&shipment_id) {
            return Err(Error::ShipmentNotFound(shipment_id.to_string()));
        }
        let document = Document::new(shipment_id, source_filename, document_type);
        let id = document.id;
        self.documents.insert(id, document);
        Ok(id)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.documents.get(&id).map(|d| d.value().clone()))
    }

    async fn list_documents(&self, shipment_id: Uuid) -> Result<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .filter(|entry| entry.shipment_id == shipment_id)
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(documents)
    }

    async fn update_status(&self, id: Uuid, status: DocumentStatus) -> Result<()> {
        self.with_document(id, |doc| {
            check_transition(id, doc.status, status.as_str())?;
            doc.status = status;
            doc.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn update_field(&self, id: Uuid, field: DocumentField) -> Result<()> {
        self.with_document(id, |doc| {
            check_transition(id, doc.status, field.name())?;
            doc.apply(field);
            Ok(())
        })
    }

    async fn log_failure(&self, id: Uuid, message: &str) -> Result<()> {
        self.with_document(id, |doc| {
            check_transition(id, doc.status, DocumentStatus::Error.as_str())?;
            doc.status = DocumentStatus::Error;
            doc.error_message = Some(message.to_string());
            doc.updated_at = Utc::now();
            Ok(())
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_document_lifecycle() {
        let store = InMemoryDocumentStore::new();
        let shipment = store.create_shipment("REF-1").await.unwrap();
        let doc = store
            .create_document(shipment, "invoice.txt", DocumentType::CommercialInvoice)
            .await
            .unwrap();

        store.update_status(doc, DocumentStatus::Processing).await.unwrap();
        store.update_field(doc, DocumentField::RawText("text".into())).await.unwrap();
        store.update_status(doc, DocumentStatus::Completed).await.unwrap();

        let document = store.get_document(doc).await.unwrap().unwrap();
        assert_eq!(document.status, DocumentStatus::Completed);
        assert_eq!(document.raw_text.as_deref(), Some("text"));
        assert_eq!(store.list_documents(shipment).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let store = InMemoryDocumentStore::new();
        let shipment = store.create_shipment("REF-2").await.unwrap();
        let doc = store
            .create_document(shipment, "invoice.txt", DocumentType::CommercialInvoice)
            .await
            .unwrap();

        store.update_status(doc, DocumentStatus::NeedsReview).await.unwrap();
        assert!(matches!(
            store.log_failure(doc, "late failure").await,
            Err(Error::InvalidTransition { .. })
        ));
        assert!(matches!(
            store.update_status(doc, DocumentStatus::Processing).await,
            Err(Error::InvalidTransition { .. })
        ));

        let document = store.get_document(doc).await.unwrap().unwrap();
        assert_eq!(document.status, DocumentStatus::NeedsReview);
        assert!(document.error_message.is_none());
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            store.create_document(Uuid::new_v4(), "a", DocumentType::Other).await,
            Err(Error::ShipmentNotFound(_))
        ));
        assert!(matches!(
            store.log_failure(Uuid::new_v4(), "x").await,
            Err(Error::DocumentNotFound(_))
        ));
    }
}
