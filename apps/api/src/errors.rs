use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::GatewayError;

/// Application-level error type.
/// Every stage returns this; any variant aborts the whole run.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Endpoint unreachable, non-success status, or a stream without a `done` marker.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Raw or extracted text is blank after trimming.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Extraction span missing or not valid JSON after cleanup.
    #[error("empty extraction: {0}")]
    Parse(String),

    /// A required external collaborator (e.g. the configured model) is unavailable.
    #[error("Dependency missing: {0}")]
    DependencyMissing(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::ModelMissing(model) => {
                AppError::DependencyMissing(format!("model '{model}' is not available"))
            }
            GatewayError::Io(e) => AppError::Io(e),
            other => AppError::Transport(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Transport(msg) => {
                tracing::error!("Transport error: {msg}");
                (StatusCode::BAD_GATEWAY, "TRANSPORT_ERROR", msg.clone())
            }
            AppError::EmptyInput(msg) => (StatusCode::BAD_REQUEST, "EMPTY_INPUT", msg.clone()),
            AppError::Parse(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_EXTRACTION",
                msg.clone(),
            ),
            AppError::DependencyMissing(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "DEPENDENCY_MISSING",
                msg.clone(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Io(e) => {
                tracing::error!("I/O error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
