//! Typed error hierarchy for distill.
//!
//! Three top-level enums cover the three subsystems:
//! - `LedgerError`: stage ledger persistence and coordinator mutations
//! - `PipelineError`: handout runner failures
//! - `AgentError`: LLM chat-completion failures

use std::path::PathBuf;

use thiserror::Error;

use crate::stage::Stage;

/// Errors from the stage ledger and the coordinator that mutates it.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to read ledger at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ledger at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(
        "Ledger at {path} belongs to module {found_module} lesson {found_lesson}, expected module {module} lesson {lesson}"
    )]
    IdentityMismatch {
        path: PathBuf,
        module: u32,
        lesson: u32,
        found_module: u32,
        found_lesson: u32,
    },

    #[error("Ledger at {path} is inconsistent: stage {stage} {problem}")]
    Inconsistent {
        path: PathBuf,
        stage: Stage,
        problem: &'static str,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from running the handout pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "Stage {stage} is marked complete but its artifact is missing. Run 'distill reset --from {stage}' or register a file with 'distill use'"
    )]
    MissingArtifact { stage: Stage },

    #[error("Override file for stage {stage} does not exist: {path}")]
    OverrideNotFound { stage: Stage, path: PathBuf },

    #[error("Stage {stage} failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from an LLM chat-completion call.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("API key for provider {provider} is not set (expected in ${env_var})")]
    MissingApiKey {
        provider: String,
        env_var: &'static str,
    },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from provider: {0}")]
    InvalidResponse(String),
}
