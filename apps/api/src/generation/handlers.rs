use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::generation::pipeline::LetterRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LetterResponse {
    pub context_id: String,
    pub version: String,
    pub path: String,
    pub letter: String,
}

/// POST /api/v1/letters
pub async fn handle_produce_letter(
    State(state): State<AppState>,
    Json(req): Json<LetterRequest>,
) -> Result<Json<LetterResponse>, AppError> {
    let outcome = state.pipeline.produce_letter(&req).await?;
    Ok(Json(LetterResponse {
        context_id: outcome.context_id,
        version: outcome.version,
        path: outcome.path.display().to_string(),
        letter: outcome.letter,
    }))
}
