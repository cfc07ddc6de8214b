//! Error taxonomy for the Chassis build orchestrator.
//!
//! Only fatal conditions are represented here. Advisory findings (missing
//! directories, unrecognized branches) and per-submodule failures are
//! absorbed where they happen and only ever logged or recorded in reports.

use std::path::PathBuf;

use crate::fallback::FallbackError;

/// Chassis orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum ChassisError {
    #[error("stage {stage}: precondition failed: {detail}")]
    PreconditionFailed { stage: String, detail: String },

    #[error("stage {stage} failed: {detail}")]
    StageFailed { stage: String, detail: String },

    #[error("failed to spawn `{program}`: {detail}")]
    Spawn { program: String, detail: String },

    #[error("`{command}` timed out after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("build output not found at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error(transparent)]
    FallbackExhausted(#[from] FallbackError),

    #[error("validation failed: missing {0}")]
    ValidationFailed(String),

    #[error("invalid registry: {0}")]
    Registry(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Chassis operations.
pub type Result<T> = std::result::Result<T, ChassisError>;
