//! SQLite database for shipments and documents
//!
//! Stage results are stored as JSON text columns; timestamps as RFC 3339.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::DocumentStore;
use crate::types::{Document, DocumentField, DocumentStatus, DocumentType, Shipment};

use super::check_transition;

const DOCUMENT_COLUMNS: &str = "id, shipment_id, source_filename, document_type, status, \
     raw_text, structured_data, classification, preflight, supervisor_verdict, \
     error_message, created_at, updated_at";

/// SQLite-backed document store
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Create or open the database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::store(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::store(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.migrate()?;
        Ok(db)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            PRAGMA temp_store=MEMORY;
        "#,
        )
        .map_err(|e| Error::store(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS shipments (
                id TEXT PRIMARY KEY,
                reference TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                shipment_id TEXT NOT NULL REFERENCES shipments(id),
                source_filename TEXT NOT NULL,
                document_type TEXT NOT NULL,
                status TEXT NOT NULL,
                raw_text TEXT,
                structured_data TEXT,
                classification TEXT,
                preflight TEXT,
                supervisor_verdict TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_shipment ON documents(shipment_id);
            CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
        "#,
        )
        .map_err(|e| Error::store(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    pub fn insert_shipment(&self, shipment: &Shipment) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO shipments (id, reference, created_at) VALUES (?1, ?2, ?3)",
            params![
                shipment.id.to_string(),
                shipment.reference,
                shipment.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::store(format!("Failed to insert shipment: {}", e)))?;
        Ok(())
    }

    pub fn find_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, reference, created_at FROM shipments WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::store(format!("Failed to get shipment: {}", e)))?;

        row.map(|(id, reference, created_at)| {
            Ok(Shipment {
                id: parse_uuid(&id)?,
                reference,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    pub fn insert_document(&self, document: &Document) -> Result<()> {
        let conn = self.conn.lock();

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM shipments WHERE id = ?1)",
                params![document.shipment_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| Error::store(format!("Failed to look up shipment: {}", e)))?;
        if !exists {
            return Err(Error::ShipmentNotFound(document.shipment_id.to_string()));
        }

        conn.execute(
            &format!(
                "INSERT INTO documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                DOCUMENT_COLUMNS
            ),
            params![
                document.id.to_string(),
                document.shipment_id.to_string(),
                document.source_filename,
                document.document_type.as_str(),
                document.status.as_str(),
                document.raw_text,
                to_json(&document.structured_data)?,
                to_json(&document.classification)?,
                to_json(&document.preflight)?,
                to_json(&document.supervisor_verdict)?,
                document.error_message,
                document.created_at.to_rfc3339(),
                document.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::store(format!("Failed to insert document: {}", e)))?;
        Ok(())
    }

    pub fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
                params![id.to_string()],
                DocumentRow::from_row,
            )
            .optional()
            .map_err(|e| Error::store(format!("Failed to get document: {}", e)))?;

        row.map(DocumentRow::into_document).transpose()
    }

    pub fn documents_for_shipment(&self, shipment_id: Uuid) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM documents WHERE shipment_id = ?1 ORDER BY rowid ASC",
                DOCUMENT_COLUMNS
            ))
            .map_err(|e| Error::store(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![shipment_id.to_string()], DocumentRow::from_row)
            .map_err(|e| Error::store(format!("Failed to list documents: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::store(format!("Failed to read document row: {}", e)))?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    pub fn set_status(&self, id: Uuid, status: DocumentStatus, message: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        let current = current_status(&conn, id)?;
        check_transition(id, current, status.as_str())?;

        conn.execute(
            "UPDATE documents SET status = ?2, error_message = COALESCE(?3, error_message), \
             updated_at = ?4 WHERE id = ?1",
            params![id.to_string(), status.as_str(), message, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::store(format!("Failed to update status: {}", e)))?;
        Ok(())
    }

    pub fn set_field(&self, id: Uuid, field: &DocumentField) -> Result<()> {
        let conn = self.conn.lock();
        let current = current_status(&conn, id)?;
        check_transition(id, current, field.name())?;

        let value = match field {
            DocumentField::RawText(text) => text.clone(),
            DocumentField::StructuredData(data) => serde_json::to_string(data)?,
            DocumentField::Classification(result) => serde_json::to_string(result)?,
            DocumentField::Preflight(report) => serde_json::to_string(report)?,
            DocumentField::SupervisorVerdict(verdict) => serde_json::to_string(verdict)?,
        };

        // Column names come from the closed DocumentField set
        conn.execute(
            &format!(
                "UPDATE documents SET {} = ?2, updated_at = ?3 WHERE id = ?1",
                field.name()
            ),
            params![id.to_string(), value, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::store(format!("Failed to update {}: {}", field.name(), e)))?;
        Ok(())
    }

    /// Run a synchronous store operation off the async runtime
    async fn blocking<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_shipment(&self, reference: &str) -> Result<Uuid> {
        let shipment = Shipment::new(reference);
        let id = shipment.id;
        self.blocking(move |db| db.insert_shipment(&shipment)).await?;
        Ok(id)
    }

    async fn get_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
        self.blocking(move |db| db.find_shipment(id)).await
    }

    async fn create_document(
        &self,
        shipment_id: Uuid,
        source_filename: &str,
        document_type: DocumentType,
    ) -> Result<Uuid> {
        let document = Document::new(shipment_id, source_filename, document_type);
        let id = document.id;
        self.blocking(move |db| db.insert_document(&document)).await?;
        Ok(id)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        self.blocking(move |db| db.find_document(id)).await
    }

    async fn list_documents(&self, shipment_id: Uuid) -> Result<Vec<Document>> {
        self.blocking(move |db| db.documents_for_shipment(shipment_id)).await
    }

    async fn update_status(&self, id: Uuid, status: DocumentStatus) -> Result<()> {
        self.blocking(move |db| db.set_status(id, status, None)).await
    }

    async fn update_field(&self, id: Uuid, field: DocumentField) -> Result<()> {
        self.blocking(move |db| db.set_field(id, &field)).await
    }

    async fn log_failure(&self, id: Uuid, message: &str) -> Result<()> {
        let message = message.to_string();
        self.blocking(move |db| db.set_status(id, DocumentStatus::Error, Some(&message)))
            .await
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

fn current_status(conn: &Connection, id: Uuid) -> Result<DocumentStatus> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM documents WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::store(format!("Failed to read status: {}", e)))?;

    status
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?
        .parse()
        .map_err(Error::Store)
}

/// Raw column values of a `documents` row
struct DocumentRow {
    id: String,
    shipment_id: String,
    source_filename: String,
    document_type: String,
    status: String,
    raw_text: Option<String>,
    structured_data: Option<String>,
    classification: Option<String>,
    preflight: Option<String>,
    supervisor_verdict: Option<String>,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DocumentRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            shipment_id: row.get(1)?,
            source_filename: row.get(2)?,
            document_type: row.get(3)?,
            status: row.get(4)?,
            raw_text: row.get(5)?,
            structured_data: row.get(6)?,
            classification: row.get(7)?,
            preflight: row.get(8)?,
            supervisor_verdict: row.get(9)?,
            error_message: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_document(self) -> Result<Document> {
        Ok(Document {
            id: parse_uuid(&self.id)?,
            shipment_id: parse_uuid(&self.shipment_id)?,
            source_filename: self.source_filename,
            document_type: self.document_type.parse().map_err(Error::Store)?,
            status: self.status.parse().map_err(Error::Store)?,
            raw_text: self.raw_text,
            structured_data: from_json(self.structured_data)?,
            classification: from_json(self.classification)?,
            preflight: from_json(self.preflight)?,
            supervisor_verdict: from_json(self.supervisor_verdict)?,
            error_message: self.error_message,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(Error::from)
}

fn from_json<T: DeserializeOwned>(column: Option<String>) -> Result<Option<T>> {
    column
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(Error::from)
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::store(format!("Invalid id '{}': {}", value, e)))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| Error::store(format!("Invalid timestamp '{}': {}", value, e)))
}
