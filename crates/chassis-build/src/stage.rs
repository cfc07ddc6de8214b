//! Build stage definitions.

use std::path::PathBuf;

use chassis_core::{ChassisError, CommandSpec, Result};
use serde::{Deserialize, Serialize};

/// Condition checked immediately before a stage's command runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    /// The directory must exist.
    DirExists(PathBuf),
}

impl Precondition {
    /// Fails with [`ChassisError::PreconditionFailed`] naming `stage`.
    pub fn check(&self, stage: &str) -> Result<()> {
        match self {
            Precondition::DirExists(dir) if dir.is_dir() => Ok(()),
            Precondition::DirExists(dir) => Err(ChassisError::PreconditionFailed {
                stage: stage.to_string(),
                detail: format!("directory {} not found", dir.display()),
            }),
        }
    }
}

/// One named step of a [`crate::BuildPipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStage {
    /// Stage name used in logs and reports (e.g. `site_build`).
    pub name: String,

    pub command: CommandSpec,

    pub precondition: Option<Precondition>,

    /// Failure is logged and recorded but does not abort the pipeline.
    pub advisory: bool,
}

impl BuildStage {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            precondition: None,
            advisory: false,
        }
    }

    /// Require `dir` to exist before running.
    pub fn requires_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.precondition = Some(Precondition::DirExists(dir.into()));
        self
    }

    /// Mark this stage advisory.
    pub fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_defaults_to_fatal() {
        let stage = BuildStage::new("site_build", CommandSpec::new("pnpm", ["build:site"]));
        assert_eq!(stage.name, "site_build");
        assert!(!stage.advisory);
        assert!(stage.precondition.is_none());
    }

    #[test]
    fn test_dir_precondition() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Precondition::DirExists(dir.path().to_path_buf())
            .check("x")
            .is_ok());

        let err = Precondition::DirExists(dir.path().join("site"))
            .check("site_install")
            .unwrap_err();
        assert!(matches!(err, ChassisError::PreconditionFailed { ref stage, .. } if stage == "site_install"));
    }
}
