/// Model Gateway — the single point of entry for all completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the completion endpoint directly.
/// Every stage goes through the `Completion` trait, which `ModelGateway` implements
/// over HTTP against a local `/api/generate` endpoint.
///
/// No retries at this layer: a transport failure aborts the current run.
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ModelConfig;

pub mod prompts;
pub mod stream;

pub use stream::{ChunkDecoder, GenerateChunk, StageSink};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response stream ended before the completion marker")]
    Incomplete,

    #[error("model '{0}' is not available on the endpoint")]
    ModelMissing(String),

    #[error("I/O error while persisting the response: {0}")]
    Io(#[from] std::io::Error),
}

/// A text-completion backend. Implementations stream the response into `sink`
/// chunk by chunk and must call `StageSink::record_prompt` before sending.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn send(&self, prompt: &str, sink: &mut StageSink) -> Result<(), GatewayError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    options: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// HTTP client for the local completion endpoint.
#[derive(Debug, Clone)]
pub struct ModelGateway {
    client: Client,
    config: ModelConfig,
}

impl ModelGateway {
    pub fn new(config: ModelConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.name
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }

    /// Confirms the configured model is listed by the endpoint.
    pub async fn check_model(&self) -> Result<(), GatewayError> {
        let response = self.client.get(self.url("/api/tags")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let tags: TagsResponse = response.json().await?;
        let wanted = self.config.name.as_str();
        let found = tags.models.iter().any(|m| {
            m.name == wanted || m.name.strip_suffix(":latest") == Some(wanted)
        });
        if found {
            Ok(())
        } else {
            Err(GatewayError::ModelMissing(wanted.to_string()))
        }
    }
}

#[async_trait]
impl Completion for ModelGateway {
    async fn send(&self, prompt: &str, sink: &mut StageSink) -> Result<(), GatewayError> {
        sink.record_prompt(prompt).await?;

        let body = GenerateRequest {
            prompt,
            model: &self.config.name,
            options: &self.config.options,
        };
        info!(model = %self.config.name, stage = %sink.stage(), "Sending prompt");

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // The endpoint answers an unknown model with 404.
            let message = response.text().await.unwrap_or_default();
            debug!("Generate endpoint returned 404: {message}");
            return Err(GatewayError::ModelMissing(self.config.name.clone()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut bytes = response.bytes_stream();
        let mut decoder = ChunkDecoder::default();

        while let Some(piece) = bytes.next().await {
            let piece = piece?;
            for chunk in decoder.push(&piece) {
                if deliver(sink, chunk).await? {
                    return Ok(());
                }
            }
        }
        if let Some(chunk) = decoder.finish() {
            if deliver(sink, chunk).await? {
                return Ok(());
            }
        }

        Err(GatewayError::Incomplete)
    }
}

/// Forwards one decoded chunk. Returns `true` once the terminal chunk is seen.
async fn deliver(sink: &mut StageSink, chunk: GenerateChunk) -> Result<bool, GatewayError> {
    if !chunk.response.is_empty() {
        sink.push(&chunk.response).await?;
    }
    if chunk.done {
        sink.finish().await?;
        debug!(stage = %sink.stage(), chars = sink.text().len(), "Response stream complete");
        return Ok(true);
    }
    Ok(false)
}
