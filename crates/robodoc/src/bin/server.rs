//! RoboDoc server binary
//!
//! Run with: cargo run -p robodoc --bin robodoc-server

use robodoc::{config::AppConfig, server::RoboDocServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "robodoc=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Generation model: {}", config.llm.generate_model);
    tracing::info!("  - Embedding model: {} ({} dims)", config.llm.embed_model, config.embeddings.dimensions);
    tracing::info!("  - Tariff schedule: {}", config.knowledge.tariff_source.display());
    tracing::info!("  - Review threshold: {}", config.review.confidence_threshold);

    let server = RoboDocServer::new(config).await?;

    // Build or load the tariff index now; on failure the first classification retries
    let index = server.state().knowledge_index().clone();
    match index.ensure_ready().await {
        Ok(()) => tracing::info!("Tariff knowledge index ready"),
        Err(e) => tracing::warn!("Tariff knowledge index not ready: {}", e),
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
