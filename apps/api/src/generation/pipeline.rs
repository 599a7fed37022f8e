//! Letter pipeline — the caller-facing `produce_letter` operation.
//!
//! Flow: stage raw inputs → resolve context directory → job extraction →
//!       applicant extraction (or reuse of a pre-staged extract) → synthesis.
//!
//! Stages run strictly in sequence; synthesis joins both extracts. Every stage
//! checks its own output is non-empty and any failure aborts the run, leaving
//! the partially populated directory for inspection.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::context::store::{
    ContextHandle, ContextStore, Stage, StageFiles, APP_RAW_FILE, JOB_RAW_FILE,
};
use crate::errors::AppError;
use crate::extraction::normalizer::{normalize, persist};
use crate::extraction::schema::{KeySchema, APPLICANT_SCHEMA, JOB_SCHEMA};
use crate::generation::composer::{compose_nested, compose_single, Contract, SourceBlock};
use crate::generation::synthesis::{finish_letter, synthesis_prompt};
use crate::llm_client::{Completion, StageSink};

const JOB_POSTING_LABEL: &str = "Job posting";

/// Input to `produce_letter`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LetterRequest {
    pub job_text: String,
    #[serde(default)]
    pub applicant_sources: Vec<String>,
    /// Readable applicant extract computed earlier; skips applicant extraction.
    #[serde(default)]
    pub applicant_extract: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LetterOutcome {
    pub context_id: String,
    pub version: String,
    pub path: PathBuf,
    pub letter: String,
}

pub struct LetterPipeline {
    store: ContextStore,
    completion: Arc<dyn Completion>,
    diagnostic_log: Option<PathBuf>,
}

impl LetterPipeline {
    pub fn new(
        store: ContextStore,
        completion: Arc<dyn Completion>,
        diagnostic_log: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            completion,
            diagnostic_log,
        }
    }

    pub async fn produce_letter(&self, request: &LetterRequest) -> Result<LetterOutcome, AppError> {
        // Stage raw inputs, then allocate the run directory
        let staging = self.store.staging().await?;
        staging.stage(JOB_RAW_FILE, &request.job_text).await?;
        staging
            .stage(APP_RAW_FILE, request.applicant_sources.join("\n\n"))
            .await?;
        if let Some(extract) = &request.applicant_extract {
            staging.stage(&applicant_extract_file(), extract).await?;
        }
        let handle = self.store.resolve(request.job_text.as_bytes(), staging).await?;

        if request.job_text.trim().is_empty() {
            return Err(AppError::EmptyInput("job posting is empty".to_string()));
        }

        // Job extraction
        let job_prompt = compose_single(
            JOB_POSTING_LABEL,
            &request.job_text,
            Contract::Extraction(&JOB_SCHEMA),
        );
        let job_extract = self.extract(&handle, Stage::Job, &job_prompt, &JOB_SCHEMA).await?;

        // Applicant extraction, unless a non-empty extract was staged
        let app_files = handle.stage(Stage::App);
        let applicant_extract = match read_staged_extract(&app_files).await? {
            Some(extract) => {
                info!(
                    context_id = %handle.context_id,
                    version = %handle.version,
                    path = %app_files.readable.display(),
                    "Reusing staged applicant extract"
                );
                extract
            }
            None => {
                let sources: Vec<&String> = request
                    .applicant_sources
                    .iter()
                    .filter(|s| !s.trim().is_empty())
                    .collect();
                if sources.is_empty() {
                    return Err(AppError::EmptyInput(
                        "no applicant source text or extract supplied".to_string(),
                    ));
                }
                let mut blocks = vec![SourceBlock::new(JOB_POSTING_LABEL, &request.job_text, 1)];
                blocks.extend(sources.iter().enumerate().map(|(i, text)| {
                    SourceBlock::new(format!("Applicant source {}", i + 1), text.as_str(), 2)
                }));
                let prompt = compose_nested(&blocks, Contract::Extraction(&APPLICANT_SCHEMA));
                self.extract(&handle, Stage::App, &prompt, &APPLICANT_SCHEMA)
                    .await?
            }
        };

        // Synthesis
        let cov_files = handle.stage(Stage::Cov);
        let raw = self
            .complete(&handle, &cov_files, &synthesis_prompt(&job_extract, &applicant_extract))
            .await?;
        let letter = finish_letter(&raw, &job_extract, &applicant_extract, &cov_files).await?;
        report(&handle, Stage::Cov, &cov_files);

        Ok(LetterOutcome {
            context_id: handle.context_id,
            version: handle.version,
            path: cov_files.readable,
            letter,
        })
    }

    /// Runs one extraction stage; returns the readable rendering.
    async fn extract(
        &self,
        handle: &ContextHandle,
        stage: Stage,
        prompt: &str,
        schema: &KeySchema,
    ) -> Result<String, AppError> {
        let files = handle.stage(stage);
        let response = self.complete(handle, &files, prompt).await?;
        let record = normalize(&response, schema)?;
        if record.is_empty() {
            return Err(AppError::EmptyInput(format!(
                "{stage} extraction produced no {}",
                schema.name
            )));
        }
        let readable = persist(&record, &files).await?;
        report(handle, stage, &files);
        Ok(readable)
    }

    async fn complete(
        &self,
        handle: &ContextHandle,
        files: &StageFiles,
        prompt: &str,
    ) -> Result<String, AppError> {
        let mut sink = StageSink::open(files, self.diagnostic_log.as_deref()).await?;
        self.completion.send(prompt, &mut sink).await?;
        let response = sink.into_text();
        if response.trim().is_empty() {
            return Err(AppError::EmptyInput(format!(
                "model returned an empty {} response for context {}",
                files.stage, handle.context_id
            )));
        }
        Ok(response)
    }
}

/// File name a pre-computed applicant extract is staged under; it doubles as the
/// `app` stage's readable artifact.
fn applicant_extract_file() -> String {
    format!("{}.txt", Stage::App.as_str())
}

async fn read_staged_extract(files: &StageFiles) -> Result<Option<String>, AppError> {
    match tokio::fs::read_to_string(&files.readable).await {
        Ok(text) if !text.trim().is_empty() => Ok(Some(text)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn report(handle: &ContextHandle, stage: Stage, files: &StageFiles) {
    info!(
        context_id = %handle.context_id,
        version = %handle.version,
        stage = %stage,
        path = %files.readable.display(),
        "Stage complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm_client::GatewayError;

    const JOB_TEXT: &str = "Acme is hiring. We need a backend engineer with 5 years of Go experience.";

    const JOB_RESPONSE: &str = "Sure, here it is:\n{\n  \"company_name\": [\"Acme\"],\n  \"job_title\": [\"Backend Engineer\"],\n  \"technical_requirements\": [\"Go\"],\n  \"experience_years\": [\"5 years\"],\n  \"soft_skills\": []\n}\n";

    const APP_RESPONSE: &str = "{\n  \"applicant_name\": [\"Ada Lovelace\"],\n  \"technical_skills\": [\"Go\", \"Rust\"]\n}";

    const COV_RESPONSE: &str = "<think>Ada has Go. secret-reasoning</think>\n**Dear {HIRING_MANAGER},**\n\nI am excited to join {COMPANY_NAME} as a {JOB_TITLE}.\n\nMy Go services ran in production for 5 years.\n\nSincerely,\n{APPLICANT_NAME}\n---\nLet me know if you want edits.";

    /// Scripted completion keyed by stage; records which stages were called.
    struct ScriptedCompletion {
        calls: AtomicUsize,
        stages: Mutex<Vec<Stage>>,
    }

    impl ScriptedCompletion {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                stages: Mutex::new(Vec::new()),
            })
        }

        fn stages(&self) -> Vec<Stage> {
            self.stages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Completion for ScriptedCompletion {
        async fn send(&self, prompt: &str, sink: &mut StageSink) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.stages.lock().unwrap().push(sink.stage());
            sink.record_prompt(prompt).await?;
            let response = match sink.stage() {
                Stage::Job => JOB_RESPONSE,
                Stage::App => APP_RESPONSE,
                Stage::Cov => COV_RESPONSE,
            };
            for piece in response.split_inclusive('\n') {
                sink.push(piece).await?;
            }
            sink.finish().await?;
            Ok(())
        }
    }

    fn pipeline(base: &std::path::Path, completion: Arc<ScriptedCompletion>) -> LetterPipeline {
        LetterPipeline::new(ContextStore::new(base), completion, None)
    }

    fn request() -> LetterRequest {
        LetterRequest {
            job_text: JOB_TEXT.to_string(),
            applicant_sources: vec!["Ada Lovelace. Go and Rust engineer.".to_string()],
            applicant_extract: None,
        }
    }

    #[tokio::test]
    async fn test_full_run_produces_letter_and_artifacts() {
        let base = tempfile::tempdir().unwrap();
        let completion = ScriptedCompletion::new();
        let outcome = pipeline(base.path(), completion.clone())
            .produce_letter(&request())
            .await
            .unwrap();

        assert_eq!(completion.stages(), vec![Stage::Job, Stage::App, Stage::Cov]);
        assert_eq!(
            outcome.letter,
            "# Dear Hiring Manager,\n\n\
I am excited to join Acme as a Backend Engineer.\n\n\
My Go services ran in production for 5 years.\n\n\
Sincerely,\n\n\
### Ada Lovelace"
        );
        assert!(!outcome.letter.contains("secret-reasoning"));

        let dir = outcome.path.parent().unwrap();
        for name in [
            JOB_RAW_FILE,
            APP_RAW_FILE,
            "job.prompt.txt",
            "job.log",
            "job.json",
            "job.txt",
            "app.prompt.txt",
            "app.log",
            "app.json",
            "app.txt",
            "cov.prompt.txt",
            "cov.log",
            "cov.md",
        ] {
            assert!(dir.join(name).exists(), "missing {name}");
        }
        assert!(!dir.join("cov.json").exists());
        assert_eq!(
            dir,
            base.path().join(&outcome.context_id).join(&outcome.version)
        );
    }

    #[tokio::test]
    async fn test_job_record_only_holds_go() {
        let base = tempfile::tempdir().unwrap();
        let outcome = pipeline(base.path(), ScriptedCompletion::new())
            .produce_letter(&request())
            .await
            .unwrap();

        let dir = outcome.path.parent().unwrap();
        let record: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("job.json")).unwrap()).unwrap();
        assert_eq!(record["technical_requirements"], serde_json::json!(["Go"]));
        assert!(record.get("soft_skills").is_none(), "empty keys are omitted");

        let log = std::fs::read_to_string(dir.join("job.log")).unwrap();
        assert_eq!(log, format!("{JOB_RESPONSE}\n"));
    }

    #[tokio::test]
    async fn test_staged_applicant_extract_skips_applicant_stage() {
        let base = tempfile::tempdir().unwrap();
        let completion = ScriptedCompletion::new();
        let staged = "applicant_name: Grace Hopper\ntechnical_skills: COBOL";
        let req = LetterRequest {
            applicant_sources: vec![],
            applicant_extract: Some(staged.to_string()),
            ..request()
        };

        let outcome = pipeline(base.path(), completion.clone())
            .produce_letter(&req)
            .await
            .unwrap();

        assert_eq!(completion.stages(), vec![Stage::Job, Stage::Cov]);
        let dir = outcome.path.parent().unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("app.txt")).unwrap(), staged);
        assert!(!dir.join("app.prompt.txt").exists());
        let cov_prompt = std::fs::read_to_string(dir.join("cov.prompt.txt")).unwrap();
        assert!(cov_prompt.contains(">> applicant_name: Grace Hopper"));
        assert!(outcome.letter.ends_with("### Grace Hopper"));
    }

    #[tokio::test]
    async fn test_blank_staged_extract_falls_back_to_extraction() {
        let base = tempfile::tempdir().unwrap();
        let completion = ScriptedCompletion::new();
        let req = LetterRequest {
            applicant_extract: Some("   \n".to_string()),
            ..request()
        };
        pipeline(base.path(), completion.clone())
            .produce_letter(&req)
            .await
            .unwrap();
        assert_eq!(completion.stages(), vec![Stage::Job, Stage::App, Stage::Cov]);
    }

    #[tokio::test]
    async fn test_empty_job_text_aborts_before_any_model_call() {
        let base = tempfile::tempdir().unwrap();
        let completion = ScriptedCompletion::new();
        let req = LetterRequest {
            job_text: "  \n\t".to_string(),
            ..request()
        };

        let err = pipeline(base.path(), completion.clone())
            .produce_letter(&req)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::EmptyInput(_)));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);

        let store = ContextStore::new(base.path());
        let id = crate::context::store::fingerprint(req.job_text.as_bytes());
        let versions = store.versions(&id).await.unwrap();
        let dir = base.path().join(&id).join(&versions[0]);
        assert!(dir.join(JOB_RAW_FILE).exists());
        assert!(!dir.join("job.prompt.txt").exists());
        assert!(!dir.join("job.json").exists());
    }

    #[tokio::test]
    async fn test_missing_applicant_material_is_empty_input() {
        let base = tempfile::tempdir().unwrap();
        let completion = ScriptedCompletion::new();
        let req = LetterRequest {
            applicant_sources: vec!["   ".to_string()],
            ..request()
        };
        let err = pipeline(base.path(), completion.clone())
            .produce_letter(&req)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyInput(_)));
        assert_eq!(completion.stages(), vec![Stage::Job]);
    }

    /// Returns prose with no JSON object for every stage.
    struct ChattyCompletion;

    #[async_trait]
    impl Completion for ChattyCompletion {
        async fn send(&self, prompt: &str, sink: &mut StageSink) -> Result<(), GatewayError> {
            sink.record_prompt(prompt).await?;
            sink.push("I'm not sure what you mean.").await?;
            sink.finish().await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unparseable_job_response_is_empty_extraction() {
        let base = tempfile::tempdir().unwrap();
        let pipeline = LetterPipeline::new(ContextStore::new(base.path()), Arc::new(ChattyCompletion), None);
        let err = pipeline.produce_letter(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert!(err.to_string().starts_with("empty extraction"));
    }

    #[tokio::test]
    async fn test_run_against_missing_model_is_dependency_missing() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        let gateway = crate::llm_client::ModelGateway::new(crate::config::ModelConfig {
            host: server.uri(),
            name: "absent:1b".to_string(),
            ..crate::config::ModelConfig::default()
        })
        .unwrap();

        let base = tempfile::tempdir().unwrap();
        let pipeline = LetterPipeline::new(ContextStore::new(base.path()), Arc::new(gateway), None);
        let err = pipeline.produce_letter(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::DependencyMissing(ref m) if m.contains("absent:1b")));
    }
}
