//! Shipping quote service
//!
//! Loads the pre-trained artifacts once and serves cost predictions over HTTP.

use anyhow::Result;
use shipping_lib::{ArtifactStore, HealthReporter, QuoteMetrics, QuotePipeline, StructuredLogger};
use shipping_server::{api, config};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "shipping-server";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting shipping-server");

    let config = config::ServiceConfig::load()?;
    info!(artifact_dir = %config.artifact_dir.display(), "Service configured");

    let logger = StructuredLogger::new(SERVICE_NAME);

    // Artifacts are loaded exactly once; failures leave the slot empty
    let store = Arc::new(ArtifactStore::load(&config.artifact_paths(), &logger));

    let metrics = QuoteMetrics::new();
    metrics.set_artifact_state(&store);

    let health = HealthReporter::new(store.clone());
    let pipeline = Arc::new(QuotePipeline::new(store));
    let state = Arc::new(api::AppState::new(
        pipeline,
        health.clone(),
        metrics,
        logger.clone(),
    ));

    health.set_ready(true);

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &addr);

    let router = api::create_router(state, config.cors_allow_any);
    api::serve(&addr, router).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
