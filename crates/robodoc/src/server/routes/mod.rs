//! API routes for the RoboDoc server

pub mod documents;
pub mod shipments;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/shipments", post(shipments::create_shipment))
        .route(
            "/shipments/:id/documents",
            get(shipments::list_documents).merge(
                post(documents::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
            ),
        )
        .route("/documents/:id", get(documents::get_document))
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "robodoc",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Trade document extraction, tariff classification and pre-flight review",
        "store": state.store().name(),
        "knowledge_index_ready": state.knowledge_index().is_ready(),
        "models": {
            "generation": config.llm.generate_model,
            "embeddings": config.llm.embed_model,
        },
        "review": {
            "confidence_threshold": config.review.confidence_threshold,
            "amount_tolerance": config.review.amount_tolerance,
        },
        "endpoints": {
            "POST /api/shipments": "Create a shipment",
            "GET /api/shipments/:id/documents": "List documents of a shipment",
            "POST /api/shipments/:id/documents": "Upload a document for processing",
            "GET /api/documents/:id": "Get document status and results"
        }
    }))
}
