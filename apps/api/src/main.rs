mod config;
mod context;
mod errors;
mod extraction;
mod generation;
mod llm_client;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::context::store::ContextStore;
use crate::generation::pipeline::LetterPipeline;
use crate::llm_client::ModelGateway;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on present-but-invalid values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Letterpress API v{}", env!("CARGO_PKG_VERSION"));

    // Context store
    tokio::fs::create_dir_all(&config.base_dir).await?;
    let store = ContextStore::new(config.base_dir.clone());
    info!("Context store at {}", config.base_dir.display());
    if let Some(path) = &config.diagnostic_log {
        info!("Diagnostic log: {}", path.display());
    }

    // Model gateway
    let gateway = Arc::new(ModelGateway::new(config.model.clone())?);
    info!(
        "Model gateway initialized (model: {}, host: {})",
        gateway.model(),
        config.model.host
    );
    // Not fatal; a run against a missing model fails with DependencyMissing.
    if let Err(e) = gateway.check_model().await {
        warn!("Model check failed: {e}");
    }

    let pipeline = Arc::new(LetterPipeline::new(
        store.clone(),
        gateway.clone(),
        config.diagnostic_log.clone(),
    ));

    // Build app state
    let state = AppState {
        config: config.clone(),
        store,
        gateway,
        pipeline,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
