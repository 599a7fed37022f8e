pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::context::handlers as context_handlers;
use crate::generation::handlers as letter_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/letters", post(letter_handlers::handle_produce_letter))
        .route(
            "/api/v1/contexts/:context_id",
            get(context_handlers::handle_context_history),
        )
        .route(
            "/api/v1/contexts/:context_id/:version/letter",
            get(context_handlers::handle_get_letter),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{Config, ModelConfig};
    use crate::context::store::ContextStore;
    use crate::generation::pipeline::LetterPipeline;
    use crate::llm_client::ModelGateway;

    fn state(base: &std::path::Path) -> AppState {
        let model = ModelConfig {
            // Nothing listens here; routes under test never reach the model.
            host: "http://127.0.0.1:9".to_string(),
            ..ModelConfig::default()
        };
        let gateway = Arc::new(ModelGateway::new(model.clone()).unwrap());
        let store = ContextStore::new(base);
        AppState {
            config: Config {
                base_dir: base.to_path_buf(),
                diagnostic_log: None,
                model,
                port: 0,
                rust_log: "info".to_string(),
            },
            pipeline: Arc::new(LetterPipeline::new(store.clone(), gateway.clone(), None)),
            store,
            gateway,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_context_is_404() {
        let base = tempfile::tempdir().unwrap();
        let response = build_router(state(base.path()))
            .oneshot(
                Request::get("/api/v1/contexts/0123456789ab")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_history_and_letter_routes_read_the_store() {
        let base = tempfile::tempdir().unwrap();
        let dir = base.path().join("0123456789ab").join("20260101T000000Z");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("cov.md"), "# Dear A,\n").unwrap();
        let router = build_router(state(base.path()));

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/contexts/0123456789ab")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["versions"],
            serde_json::json!(["20260101T000000Z"])
        );

        let response = router
            .oneshot(
                Request::get("/api/v1/contexts/0123456789ab/20260101T000000Z/letter")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["letter"], "# Dear A,\n");
    }

    #[tokio::test]
    async fn test_empty_job_text_is_rejected_with_400() {
        let base = tempfile::tempdir().unwrap();
        let response = build_router(state(base.path()))
            .oneshot(
                Request::post("/api/v1/letters")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"job_text": "   ", "applicant_sources": ["cv"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "EMPTY_INPUT");
    }
}
