//! Streaming plumbing for the Model Gateway.
//!
//! `ChunkDecoder` turns an arbitrary byte stream of newline-delimited JSON into
//! `GenerateChunk`s. `StageSink` persists the prompt and tees every chunk into the
//! stage log and the diagnostic log as it arrives, so a killed run still leaves
//! its partial output on disk.

use std::path::{Path, PathBuf};

use bytes::BytesMut;
use serde::Deserialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::context::store::{Stage, StageFiles};

/// One streamed object from `/api/generate`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Incremental NDJSON decoder. Buffers raw bytes so a UTF-8 sequence or a JSON
/// object split across network reads is reassembled before decoding.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: BytesMut,
}

impl ChunkDecoder {
    /// Feeds raw bytes and returns every complete chunk now available.
    /// Malformed lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<GenerateChunk> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if let Some(chunk) = decode_line(&line) {
                chunks.push(chunk);
            }
        }
        chunks
    }

    /// Decodes whatever trails the last newline once the stream has ended.
    pub fn finish(&mut self) -> Option<GenerateChunk> {
        let rest = self.buffer.split();
        decode_line(&rest)
    }
}

fn decode_line(line: &[u8]) -> Option<GenerateChunk> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<GenerateChunk>(text) {
        Ok(chunk) => Some(chunk),
        Err(e) => {
            debug!("Dropping malformed stream chunk ({e}): {text}");
            None
        }
    }
}

/// Receives one stage's response stream.
pub struct StageSink {
    stage: Stage,
    prompt_path: PathBuf,
    transcript: File,
    diagnostic: Option<File>,
    text: String,
    finished: bool,
}

impl StageSink {
    pub async fn open(files: &StageFiles, diagnostic_log: Option<&Path>) -> std::io::Result<Self> {
        let transcript = File::create(&files.log).await?;
        let diagnostic = match diagnostic_log {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?,
            ),
            None => None,
        };
        Ok(Self {
            stage: files.stage,
            prompt_path: files.prompt.clone(),
            transcript,
            diagnostic,
            text: String::new(),
            finished: false,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Persists the exact prompt sent.
    pub async fn record_prompt(&mut self, prompt: &str) -> std::io::Result<()> {
        tokio::fs::write(&self.prompt_path, prompt).await
    }

    pub async fn push(&mut self, chunk: &str) -> std::io::Result<()> {
        self.text.push_str(chunk);
        self.transcript.write_all(chunk.as_bytes()).await?;
        self.transcript.flush().await?;
        if let Some(diagnostic) = self.diagnostic.as_mut() {
            diagnostic.write_all(chunk.as_bytes()).await?;
            diagnostic.flush().await?;
        }
        Ok(())
    }

    /// Marks the terminal chunk; appends exactly one trailing line break.
    pub async fn finish(&mut self) -> std::io::Result<()> {
        if !self.finished {
            self.push("\n").await?;
            self.finished = true;
        }
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
