//! External command execution.
//!
//! Every tool the orchestrator drives (`git`, `pnpm`, `npm`) is an opaque
//! external command. Only its exit status is consumed. [`CommandRunner`] is
//! the seam: [`ProcessRunner`] spawns real child processes, and
//! [`crate::fakes::ScriptedRunner`] replays scripted results in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::error::{ChassisError, Result};

/// One external command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,

    /// Arguments passed verbatim.
    pub args: Vec<String>,

    /// Working directory (workspace root when `None`).
    pub cwd: Option<PathBuf>,

    /// Capture output instead of streaming it to the terminal.
    pub quiet: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            quiet: false,
        }
    }

    /// Build from an argv vector as found in config files
    /// (`["pnpm", "build:site"]`).
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ChassisError::Config("command must not be empty".to_string()))?;
        Ok(Self::new(program.clone(), args.iter().cloned()))
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (-1 when terminated by a signal).
    pub exit_code: i32,

    /// Captured stdout (empty unless the command ran quiet).
    pub stdout: String,

    /// Captured stderr (empty unless the command ran quiet).
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            success: true,
            ..Self::default()
        }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            success: false,
            ..Self::default()
        }
    }

    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Human-readable failure description naming the command.
    pub fn failure_detail(&self, spec: &CommandSpec) -> String {
        let mut detail = format!("`{spec}` exited with code {}", self.exit_code);
        if let Some(line) = self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            detail.push_str(": ");
            detail.push_str(line.trim());
        }
        detail
    }

    /// Turn a non-zero exit into [`ChassisError::StageFailed`] for `stage`.
    pub fn check(self, stage: &str, spec: &CommandSpec) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(ChassisError::StageFailed {
                stage: stage.to_string(),
                detail: self.failure_detail(spec),
            })
        }
    }
}

/// Backend that executes external commands.
///
/// `Err` is reserved for commands that could not run to completion (spawn
/// failure, timeout). A command that ran and exited non-zero returns `Ok`
/// with `success == false`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as child processes via `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Working directory used when a spec has no `cwd`.
    root: Option<PathBuf>,

    /// Per-command timeout in seconds (0 = wait indefinitely).
    timeout_secs: u64,
}

impl ProcessRunner {
    pub fn new(root: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            root: Some(root.into()),
            timeout_secs,
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let start = Instant::now();
        debug!(command = %spec, cwd = ?spec.cwd, "Running command");

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).kill_on_drop(true);
        if let Some(dir) = spec.cwd.as_ref().or(self.root.as_ref()) {
            command.current_dir(dir);
        }
        if spec.quiet {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let child = command.spawn().map_err(|e| ChassisError::Spawn {
            program: spec.program.clone(),
            detail: e.to_string(),
        })?;

        let output = if self.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| ChassisError::Timeout {
                command: spec.to_string(),
                timeout_secs: self.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}
