//! Shipment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Document, Shipment};

/// Body of `POST /api/shipments`
#[derive(Debug, Deserialize)]
pub struct CreateShipmentRequest {
    pub reference: String,
}

/// Documents of one shipment
#[derive(Debug, Serialize)]
pub struct ShipmentDocumentsResponse {
    pub shipment: Shipment,
    pub documents: Vec<Document>,
    pub total_count: usize,
}

/// POST /api/shipments - Create a shipment
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(request): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<Shipment>)> {
    let reference = request.reference.trim();
    if reference.is_empty() {
        return Err(Error::input("Shipment reference must not be empty"));
    }

    let id = state.store().create_shipment(reference).await?;
    let shipment = state
        .store()
        .get_shipment(id)
        .await?
        .ok_or_else(|| Error::ShipmentNotFound(id.to_string()))?;

    tracing::info!("Created shipment {} ({})", shipment.id, shipment.reference);
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// GET /api/shipments/:id/documents - List documents of a shipment
pub async fn list_documents(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShipmentDocumentsResponse>> {
    let shipment = state
        .store()
        .get_shipment(id)
        .await?
        .ok_or_else(|| Error::ShipmentNotFound(id.to_string()))?;

    let documents = state.store().list_documents(id).await?;
    let total_count = documents.len();

    Ok(Json(ShipmentDocumentsResponse {
        shipment,
        documents,
        total_count,
    }))
}
