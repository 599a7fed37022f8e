use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm_client::GatewayError;
use crate::state::AppState;

/// GET /health
/// Returns service status plus whether the configured model is available.
/// A missing or unreachable model is reported, not failed.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let model = match state.gateway.check_model().await {
        Ok(()) => "available",
        Err(GatewayError::ModelMissing(_)) => "missing",
        Err(e) => {
            warn!("Model endpoint check failed: {e}");
            "unreachable"
        }
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "letterpress-api",
        "model": model,
        "model_name": state.gateway.model(),
        "context_store": state.config.base_dir.display().to_string(),
    }))
}
