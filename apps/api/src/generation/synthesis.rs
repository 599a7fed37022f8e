//! Synthesis — composes the two extract renderings into the final letter.
//!
//! Job material is the outer quote, applicant material the inner one. The raw
//! stream goes through `cleanup::clean_letter` before it is persisted.

use tracing::info;

use crate::context::store::StageFiles;
use crate::errors::AppError;
use crate::extraction::record::ExtractRecord;
use crate::generation::cleanup::{clean_letter, PlaceholderBindings};
use crate::generation::composer::{compose_nested, Contract, SourceBlock};

pub const JOB_LABEL: &str = "Job requirements";
pub const APPLICANT_LABEL: &str = "Applicant qualifications";

pub fn synthesis_prompt(job_extract: &str, applicant_extract: &str) -> String {
    compose_nested(
        &[
            SourceBlock::new(JOB_LABEL, job_extract, 1),
            SourceBlock::new(APPLICANT_LABEL, applicant_extract, 2),
        ],
        Contract::Synthesis,
    )
}

/// Binds template tokens to the first value of the matching extract field.
pub fn bindings_from(job_extract: &str, applicant_extract: &str) -> PlaceholderBindings {
    let job = ExtractRecord::from_readable(job_extract);
    let applicant = ExtractRecord::from_readable(applicant_extract);
    PlaceholderBindings {
        hiring_manager: job.first("hiring_manager").map(String::from),
        company_name: job.first("company_name").map(String::from),
        job_title: job.first("job_title").map(String::from),
        applicant_name: applicant.first("applicant_name").map(String::from),
    }
}

/// Cleans the raw synthesis response and persists the letter.
pub async fn finish_letter(
    raw_response: &str,
    job_extract: &str,
    applicant_extract: &str,
    files: &StageFiles,
) -> Result<String, AppError> {
    let letter = clean_letter(raw_response, &bindings_from(job_extract, applicant_extract));
    if letter.trim().is_empty() {
        return Err(AppError::EmptyInput(
            "synthesis produced an empty letter".to_string(),
        ));
    }
    tokio::fs::write(&files.readable, format!("{letter}\n")).await?;
    info!(path = %files.readable.display(), "Letter persisted");
    Ok(letter)
}
