//! Context Store — content-addressed, timestamp-versioned run directories.
//!
//! Layout: `{base}/{context_id}/{version}/`. A directory is created once per run
//! and is append-only afterwards: nothing here deletes, renames or reuses one.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::errors::AppError;

/// Hex characters of the SHA-256 digest kept as the context fingerprint (48 bits).
pub const FINGERPRINT_LEN: usize = 12;
/// UTC, second granularity.
pub const VERSION_FORMAT: &str = "%Y%m%dT%H%M%SZ";
/// Upper bound on `-N` suffixes tried when a same-second rerun collides.
const MAX_VERSION_SUFFIX: u32 = 100;

/// Raw job posting, staged before the directory exists.
pub const JOB_RAW_FILE: &str = "job.raw.txt";
/// Applicant source texts joined by a blank line.
pub const APP_RAW_FILE: &str = "app.raw.txt";
pub const LETTER_FILE: &str = "cov.md";

/// One extraction or synthesis step with its own artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Job,
    App,
    Cov,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Job => "job",
            Stage::App => "app",
            Stage::Cov => "cov",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paths of the per-stage artifacts inside a context directory.
#[derive(Debug, Clone)]
pub struct StageFiles {
    pub stage: Stage,
    pub prompt: PathBuf,
    pub log: PathBuf,
    /// Canonical structured record. Only written by `job` and `app`.
    pub record: PathBuf,
    /// Human-readable artifact; the final letter for `cov`.
    pub readable: PathBuf,
}

/// A resolved (ContextID, ContextVersion) pair and its directory.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    pub context_id: String,
    pub version: String,
    pub dir: PathBuf,
}

impl ContextHandle {
    pub fn stage(&self, stage: Stage) -> StageFiles {
        let name = stage.as_str();
        let readable = match stage {
            Stage::Cov => self.dir.join(LETTER_FILE),
            _ => self.dir.join(format!("{name}.txt")),
        };
        StageFiles {
            stage,
            prompt: self.dir.join(format!("{name}.prompt.txt")),
            log: self.dir.join(format!("{name}.log")),
            record: self.dir.join(format!("{name}.json")),
            readable,
        }
    }
}

/// Scratch directory holding raw inputs until `ContextStore::resolve` moves them.
///
/// Lives inside the base directory so the move is a same-filesystem rename.
/// Dropping an unresolved `Staging` removes it.
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub async fn stage(&self, name: &str, contents: impl AsRef<[u8]>) -> Result<(), AppError> {
        tokio::fs::write(self.dir.path().join(name), contents).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ContextStore {
    base: PathBuf,
}

impl ContextStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Opens a fresh staging area under the base directory.
    pub async fn staging(&self) -> Result<Staging, AppError> {
        tokio::fs::create_dir_all(&self.base).await?;
        let dir = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&self.base)?;
        Ok(Staging { dir })
    }

    /// Allocates the directory for `raw_input` at the current UTC second and
    /// moves every staged file into it.
    pub async fn resolve(&self, raw_input: &[u8], staging: Staging) -> Result<ContextHandle, AppError> {
        self.resolve_at(raw_input, staging, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        raw_input: &[u8],
        staging: Staging,
        now: DateTime<Utc>,
    ) -> Result<ContextHandle, AppError> {
        let context_id = fingerprint(raw_input);
        let parent = self.base.join(&context_id);
        tokio::fs::create_dir_all(&parent).await?;

        let (version, dir) = create_version_dir(&parent, &version_token(now)).await?;

        let mut entries = tokio::fs::read_dir(staging.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dir.join(entry.file_name());
            tokio::fs::rename(entry.path(), &target).await?;
            debug!("Moved staged {} into {}", entry.path().display(), target.display());
        }

        info!(
            context_id = %context_id,
            version = %version,
            path = %dir.display(),
            "Context directory allocated"
        );

        Ok(ContextHandle {
            context_id,
            version,
            dir,
        })
    }

    /// Lists every stored version for a fingerprint, oldest first.
    pub async fn versions(&self, context_id: &str) -> Result<Vec<String>, AppError> {
        ensure_plain_token(context_id)?;
        let parent = self.base.join(context_id);
        let mut entries = match tokio::fs::read_dir(&parent).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!("Context {context_id} not found")))
            }
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        versions.sort_by(|a, b| version_order(a).cmp(&version_order(b)));

        if versions.is_empty() {
            return Err(AppError::NotFound(format!("Context {context_id} has no versions")));
        }
        Ok(versions)
    }

    /// Reads the final letter of one run.
    pub async fn read_letter(&self, context_id: &str, version: &str) -> Result<String, AppError> {
        ensure_plain_token(context_id)?;
        ensure_plain_token(version)?;
        let path = self.base.join(context_id).join(version).join(LETTER_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(letter) => Ok(letter),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(format!(
                "No letter for context {context_id} version {version}"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Leading slice of the SHA-256 hex digest of the raw bytes.
/// Truncation collisions are accepted.
pub fn fingerprint(raw_input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_input);
    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

pub fn version_token(now: DateTime<Utc>) -> String {
    now.format(VERSION_FORMAT).to_string()
}

/// Sort key: the timestamp token, then the numeric same-second suffix.
fn version_order(version: &str) -> (&str, u32) {
    match version.split_once('-') {
        Some((token, suffix)) => (token, suffix.parse().unwrap_or(u32::MAX)),
        None => (version, 0),
    }
}

/// Creates `{parent}/{token}`, falling back to `{token}-1`, `{token}-2`, ...
/// when a rerun in the same second already holds the name.
async fn create_version_dir(parent: &Path, token: &str) -> Result<(String, PathBuf), AppError> {
    for attempt in 0..=MAX_VERSION_SUFFIX {
        let version = if attempt == 0 {
            token.to_string()
        } else {
            format!("{token}-{attempt}")
        };
        let dir = parent.join(&version);
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => return Ok((version, dir)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        format!("exhausted version suffixes for {token} in {}", parent.display()),
    )))
}

/// Path components accepted from callers: ASCII alphanumerics and `-` only.
fn ensure_plain_token(token: &str) -> Result<(), AppError> {
    let plain = !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if plain {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("'{token}' is not a valid context token")))
    }
}
