//! Ordered stage execution with output relocation.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chassis_core::workspace::{list_entries, replace_dir};
use chassis_core::{ChassisError, CommandRunner, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::stage::BuildStage;

/// Result of one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit code (-1 when the command never produced one).
    pub exit_code: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,

    /// Failure description for stages that did not pass.
    pub error: Option<String>,

    pub advisory: bool,
}

impl StageResult {
    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Move build output into its canonical location after all stages pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Result of a complete pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: String,

    /// Pipeline name.
    pub pipeline: String,

    /// Results of executed stages, in order.
    pub stages: Vec<StageResult>,

    /// Destination the output was relocated to.
    pub relocated: Option<PathBuf>,

    /// Entries found in the verification directory, `None` when it was
    /// absent or not configured.
    pub verified: Option<Vec<String>>,

    pub started_at: DateTime<Utc>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the stage command lines.
    pub spec_digest: String,
}

impl PipelineReport {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed (advisory only, fatal failures abort).
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }
}

/// Named, ordered list of stages.
///
/// Stages run strictly one after another. A failed precondition or a failed
/// non-advisory command aborts the pipeline with an error; later stages never
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPipeline {
    pub name: String,
    pub stages: Vec<BuildStage>,
    pub relocation: Option<Relocation>,
    /// Directory expected after the build; checked but never fatal.
    pub verify: Option<PathBuf>,
}

impl BuildPipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            relocation: None,
            verify: None,
        }
    }

    pub fn stage(mut self, stage: BuildStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Replace `to` with a copy of `from` once all stages pass.
    pub fn relocate(mut self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        self.relocation = Some(Relocation {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn verify_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.verify = Some(dir.into());
        self
    }

    /// SHA-256 over the stage names and command lines.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for stage in &self.stages {
            hasher.update(stage.name.as_bytes());
            hasher.update([0]);
            hasher.update(stage.command.to_string().as_bytes());
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }

    /// Execute every stage, then relocate and verify.
    pub async fn run(&self, runner: &dyn CommandRunner) -> Result<PipelineReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let spec_digest = self.digest();

        info!(
            run_id = %run_id,
            pipeline = %self.name,
            stages = self.stages.len(),
            digest = %&spec_digest[..12],
            "Starting pipeline"
        );

        let mut results = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            results.push(self.run_stage(stage, runner).await?);
        }

        let relocated = match &self.relocation {
            Some(relocation) => Some(relocate(relocation)?),
            None => None,
        };
        let verified = self.verify.as_ref().and_then(|dir| verify(dir));

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, pipeline = %self.name, duration_ms, "Pipeline completed");

        Ok(PipelineReport {
            run_id,
            pipeline: self.name.clone(),
            stages: results,
            relocated,
            verified,
            started_at,
            duration_ms,
            spec_digest,
        })
    }

    async fn run_stage(&self, stage: &BuildStage, runner: &dyn CommandRunner) -> Result<StageResult> {
        if let Some(precondition) = &stage.precondition {
            precondition.check(&stage.name).map_err(|e| {
                error!(stage = %stage.name, error = %e, "Precondition failed");
                e
            })?;
        }

        info!(stage = %stage.name, command = %stage.command, "Executing stage");
        let start = Instant::now();

        let (exit_code, err) = match runner.run(&stage.command).await {
            Ok(output) if output.passed() => {
                return Ok(StageResult {
                    stage_name: stage.name.clone(),
                    exit_code: output.exit_code,
                    duration_ms: output.duration_ms,
                    success: true,
                    error: None,
                    advisory: stage.advisory,
                });
            }
            Ok(output) => {
                let err = ChassisError::StageFailed {
                    stage: stage.name.clone(),
                    detail: output.failure_detail(&stage.command),
                };
                (output.exit_code, err)
            }
            Err(e) => (-1, e),
        };

        if !stage.advisory {
            error!(stage = %stage.name, error = %err, "Stage failed");
            return Err(err);
        }

        warn!(stage = %stage.name, error = %err, "Advisory stage failed, continuing");
        Ok(StageResult {
            stage_name: stage.name.clone(),
            exit_code,
            duration_ms: start.elapsed().as_millis() as u64,
            success: false,
            error: Some(err.to_string()),
            advisory: true,
        })
    }
}

fn relocate(relocation: &Relocation) -> Result<PathBuf> {
    if !relocation.from.is_dir() {
        error!(path = %relocation.from.display(), "Build output not found");
        return Err(ChassisError::MissingOutput(relocation.from.clone()));
    }
    info!(
        from = %relocation.from.display(),
        to = %relocation.to.display(),
        "Copying build output"
    );
    replace_dir(&relocation.from, &relocation.to)?;
    Ok(relocation.to.clone())
}

fn verify(dir: &Path) -> Option<Vec<String>> {
    match list_entries(dir) {
        Ok(entries) => {
            info!(path = %dir.display(), entries = %entries.join(", "), "Verified build output");
            Some(entries)
        }
        Err(_) => {
            warn!(path = %dir.display(), "Build output location may have changed");
            None
        }
    }
}
