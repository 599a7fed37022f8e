use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

/// Application configuration loaded from environment variables.
/// Every option has a default; a present-but-invalid value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the persisted `{base}/{context_id}/{version}/` layout.
    pub base_dir: PathBuf,
    /// Append-mode file receiving a copy of every model response stream.
    /// `None` discards the diagnostic copy.
    pub diagnostic_log: Option<PathBuf>,
    pub model: ModelConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Settings for the local text-completion endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub host: String,
    pub name: String,
    /// Merged into every request body as `options`.
    pub options: Map<String, Value>,
    pub timeout_secs: u64,
}

pub const DEFAULT_BASE_DIR: &str = "./contexts";
pub const DEFAULT_MODEL_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL_NAME: &str = "llama3.2:3b";
const DEFAULT_CONTEXT_WINDOW: u64 = 8192;
const DEFAULT_TIMEOUT_SECS: u64 = 600;

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MODEL_HOST.to_string(),
            name: DEFAULT_MODEL_NAME.to_string(),
            options: default_model_options(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let options = match std::env::var("MODEL_OPTIONS") {
            Ok(raw) => parse_model_options(&raw)?,
            Err(_) => default_model_options(),
        };

        Ok(Config {
            base_dir: std::env::var("LETTERS_BASE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_BASE_DIR)),
            diagnostic_log: std::env::var("DIAGNOSTIC_LOG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            model: ModelConfig {
                host: std::env::var("MODEL_HOST")
                    .unwrap_or_else(|_| DEFAULT_MODEL_HOST.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                name: std::env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string()),
                options,
                timeout_secs: std::env::var("MODEL_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
                    .parse::<u64>()
                    .context("MODEL_TIMEOUT_SECS must be a whole number of seconds")?,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Parses `MODEL_OPTIONS`, which must be a JSON object.
pub fn parse_model_options(raw: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(raw).context("MODEL_OPTIONS must be valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("MODEL_OPTIONS must be a JSON object, got {other}"),
    }
}

fn default_model_options() -> Map<String, Value> {
    let mut options = Map::new();
    options.insert("num_ctx".to_string(), Value::from(DEFAULT_CONTEXT_WINDOW));
    options
}
