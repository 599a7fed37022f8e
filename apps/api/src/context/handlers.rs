use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ContextHistoryResponse {
    pub context_id: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LetterResponse {
    pub context_id: String,
    pub version: String,
    pub letter: String,
}

/// GET /api/v1/contexts/:context_id
pub async fn handle_context_history(
    State(state): State<AppState>,
    Path(context_id): Path<String>,
) -> Result<Json<ContextHistoryResponse>, AppError> {
    let versions = state.store.versions(&context_id).await?;
    Ok(Json(ContextHistoryResponse {
        context_id,
        versions,
    }))
}

/// GET /api/v1/contexts/:context_id/:version/letter
pub async fn handle_get_letter(
    State(state): State<AppState>,
    Path((context_id, version)): Path<(String, String)>,
) -> Result<Json<LetterResponse>, AppError> {
    let letter = state.store.read_letter(&context_id, &version).await?;
    Ok(Json(LetterResponse {
        context_id,
        version,
        letter,
    }))
}
