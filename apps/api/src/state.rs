use std::sync::Arc;

use crate::config::Config;
use crate::context::store::ContextStore;
use crate::generation::pipeline::LetterPipeline;
use crate::llm_client::ModelGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: ContextStore,
    /// Kept alongside the pipeline for the health check's model probe.
    pub gateway: Arc<ModelGateway>,
    pub pipeline: Arc<LetterPipeline>,
}
