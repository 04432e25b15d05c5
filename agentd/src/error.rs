//! Typed domain errors, one per crate boundary, per the error taxonomy.
//!
//! These carry enough structure for HTTP handlers to map them to status
//! codes without leaking internal error text to clients.

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("sandbox image '{0}' not found")]
    ImageMissing(String),

    #[error("container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("exec timed out after {0:?}")]
    ExecTimeout(std::time::Duration),

    #[error("exec failed with status {status}: {message}")]
    ExecFailed { status: i64, message: String },

    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("path escapes workspace root: {0}")]
    PathTraversal(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("malformed tool arguments: {0}")]
    MalformedArgs(#[from] crate::domain::MalformedToolArgs),
}

/// Top-level application error, surfaced by HTTP handlers and the task worker.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    AuthRejected,

    #[error("task '{0}' is already running")]
    DuplicateTask(String),

    #[error("task '{0}' not found")]
    TaskNotFound(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("agent loop hit its iteration cap")]
    MaxIterationsHit,

    #[error("agent loop hit the consecutive-error cap")]
    ConsecutiveErrorCap,
}

impl AppError {
    /// Map to the HTTP status code the external interface contract names.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::AuthRejected => 401,
            AppError::DuplicateTask(_) => 409,
            AppError::TaskNotFound(_) => 404,
            _ => 500,
        }
    }
}
