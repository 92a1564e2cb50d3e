//! Document upload and status endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::SourceFile;
use crate::server::state::AppState;
use crate::types::{Document, DocumentStatus, DocumentType};

/// Response for an accepted upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub shipment_id: Uuid,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
}

/// POST /api/shipments/:id/documents - Upload a document for processing
///
/// Multipart fields: `document_type` (optional, defaults to
/// `commercial_invoice`) and the file itself. Processing runs in the
/// background; poll `GET /api/documents/:id` for the outcome.
pub async fn upload_document(
    State(state): State<AppState>,
    Path(shipment_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    if state.store().get_shipment(shipment_id).await?.is_none() {
        return Err(Error::ShipmentNotFound(shipment_id.to_string()));
    }

    let mut document_type = DocumentType::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::input(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some("document_type") {
            let value = field
                .text()
                .await
                .map_err(|e| Error::input(format!("Failed to read document_type: {}", e)))?;
            document_type = value.parse().map_err(Error::Input)?;
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("upload_{}.bin", Uuid::new_v4()));
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::input(format!("Failed to read file: {}", e)))?;
        upload = Some((filename, data));
    }

    let (filename, data) = upload.ok_or_else(|| Error::input("No file in upload"))?;
    if data.is_empty() {
        return Err(Error::input(format!("Uploaded file '{}' is empty", filename)));
    }

    let source = SourceFile::staged(&data, &state.config().storage.upload_dir, &filename)?;
    let document_id = state
        .store()
        .create_document(shipment_id, &filename, document_type)
        .await?;

    tracing::info!(
        "Accepted {} '{}' ({} bytes) as document {}",
        document_type,
        filename,
        data.len(),
        document_id
    );

    // Detached; the pipeline records its own outcome on the document
    state.pipeline().clone().spawn(document_id, source);

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            document_id,
            shipment_id,
            document_type,
            status: DocumentStatus::Received,
        }),
    ))
}

/// GET /api/documents/:id - Get a document with its stage results
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>> {
    let document = state
        .store()
        .get_document(id)
        .await?
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

    Ok(Json(document))
}
