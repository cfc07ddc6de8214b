//! Submodule synchronization with per-submodule fault isolation.
//!
//! [`SubmoduleSyncEngine::sync`] brings every registered submodule to its
//! latest remote state with `git submodule update --remote --merge`. A
//! missing or conflicted submodule is recorded and skipped. Local changes
//! are never discarded, and the overall call never fails.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::error::{ChassisError, Result};
use crate::git;

/// One external repository mounted into the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleSpec {
    /// Display name (e.g. `chassis-tokens`).
    pub name: String,

    /// Path relative to the workspace root (e.g. `vendor/tokens`).
    pub path: String,
}

impl SubmoduleSpec {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Immutable, validated list of submodules.
///
/// Paths are unique, so the concurrent sync mode never has two tasks
/// writing to the same submodule directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleRegistry {
    specs: Vec<SubmoduleSpec>,
}

impl SubmoduleRegistry {
    pub fn new(specs: Vec<SubmoduleSpec>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for spec in &specs {
            if spec.name.trim().is_empty() || spec.path.trim().is_empty() {
                return Err(ChassisError::Registry(
                    "submodule name and path must not be empty".to_string(),
                ));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(ChassisError::Registry(format!(
                    "duplicate submodule name: {}",
                    spec.name
                )));
            }
            if !paths.insert(normalize_path(&spec.path)) {
                return Err(ChassisError::Registry(format!(
                    "duplicate submodule path: {}",
                    spec.path
                )));
            }
        }
        Ok(Self { specs })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubmoduleSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn normalize_path(path: &str) -> String {
    path.trim().trim_start_matches("./").trim_end_matches('/').to_string()
}

/// Per-submodule sync status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    /// Update refused (conflict or uncommitted local changes); current
    /// version kept.
    SkippedLocalChanges,
    /// Path not present on disk.
    Missing,
}

/// Result of syncing one submodule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub name: String,
    pub path: String,
    pub status: SyncStatus,
    /// Failure detail for skipped submodules.
    pub detail: Option<String>,
}

/// What happened during the registry-wide precheck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStatus {
    /// `git submodule status` succeeded; no initialization needed.
    AlreadyInitialized,
    /// Precheck failed and the recursive initialize succeeded.
    Initialized,
    /// Precheck failed and so did the initialize; sync continued anyway.
    Failed(String),
}

/// Aggregate of one sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub init: InitStatus,
    /// Outcomes in registry order.
    pub outcomes: Vec<SyncOutcome>,
    /// `Some(true)` when `git status --porcelain` showed changes, `None` when
    /// the check could not run.
    pub pending_changes: Option<bool>,
}

impl SyncReport {
    pub fn count(&self, status: SyncStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn outcome(&self, name: &str) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

/// How submodule updates are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Sequential,
    /// All updates in flight at once; outcomes still reported in registry
    /// order and one failure never cancels the others.
    Concurrent,
}

/// Syncs a [`SubmoduleRegistry`] inside a workspace root.
#[derive(Debug, Clone)]
pub struct SubmoduleSyncEngine {
    root: PathBuf,
    registry: SubmoduleRegistry,
    mode: SyncMode,
}

impl SubmoduleSyncEngine {
    pub fn new(root: impl Into<PathBuf>, registry: SubmoduleRegistry) -> Self {
        Self {
            root: root.into(),
            registry,
            mode: SyncMode::Sequential,
        }
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sync every registered submodule. Always returns a report.
    pub async fn sync(&self, runner: &dyn CommandRunner) -> SyncReport {
        info!(count = self.registry.len(), mode = ?self.mode, "Syncing submodules");

        let init = self.ensure_initialized(runner).await;

        let outcomes = match self.mode {
            SyncMode::Sequential => {
                let mut outcomes = Vec::with_capacity(self.registry.len());
                for spec in self.registry.iter() {
                    outcomes.push(self.sync_one(spec, runner).await);
                }
                outcomes
            }
            SyncMode::Concurrent => {
                futures::future::join_all(
                    self.registry.iter().map(|spec| self.sync_one(spec, runner)),
                )
                .await
            }
        };

        let pending_changes = self.check_pending_changes(runner).await;

        let report = SyncReport {
            init,
            outcomes,
            pending_changes,
        };
        info!(
            synced = report.count(SyncStatus::Synced),
            skipped = report.count(SyncStatus::SkippedLocalChanges),
            missing = report.count(SyncStatus::Missing),
            "Submodule sync completed"
        );
        report
    }

    async fn ensure_initialized(&self, runner: &dyn CommandRunner) -> InitStatus {
        let status = git::submodule_status().in_dir(&self.root);
        if matches!(runner.run(&status).await, Ok(ref out) if out.passed()) {
            return InitStatus::AlreadyInitialized;
        }

        info!("Initializing submodules");
        let init = git::submodule_init_recursive().in_dir(&self.root);
        let failure = match runner.run(&init).await {
            Ok(out) if out.passed() => return InitStatus::Initialized,
            Ok(out) => out.failure_detail(&init),
            Err(e) => e.to_string(),
        };
        warn!(
            error = %failure,
            "Some submodules may not be available or have uncommitted changes; continuing with existing submodules"
        );
        InitStatus::Failed(failure)
    }

    async fn sync_one(&self, spec: &SubmoduleSpec, runner: &dyn CommandRunner) -> SyncOutcome {
        let local = self.root.join(&spec.path);
        if !local.exists() {
            warn!(submodule = %spec.name, path = %spec.path, "Submodule not found");
            return SyncOutcome {
                name: spec.name.clone(),
                path: spec.path.clone(),
                status: SyncStatus::Missing,
                detail: None,
            };
        }

        info!(submodule = %spec.name, "Syncing submodule");
        let update = git::submodule_update_merge(&spec.path).in_dir(&self.root);
        let failure = match runner.run(&update).await {
            Ok(out) if out.passed() => None,
            Ok(out) => Some(out.failure_detail(&update)),
            Err(e) => Some(e.to_string()),
        };

        match failure {
            None => {
                info!(submodule = %spec.name, "Submodule synced");
                SyncOutcome {
                    name: spec.name.clone(),
                    path: spec.path.clone(),
                    status: SyncStatus::Synced,
                    detail: None,
                }
            }
            Some(detail) => {
                warn!(
                    submodule = %spec.name,
                    error = %detail,
                    "Submodule has local changes or conflicts, keeping current version"
                );
                SyncOutcome {
                    name: spec.name.clone(),
                    path: spec.path.clone(),
                    status: SyncStatus::SkippedLocalChanges,
                    detail: Some(detail),
                }
            }
        }
    }

    async fn check_pending_changes(&self, runner: &dyn CommandRunner) -> Option<bool> {
        match runner.run(&git::status_porcelain().in_dir(&self.root)).await {
            Ok(out) if out.passed() => {
                let dirty = !out.stdout.trim().is_empty();
                if dirty {
                    warn!(
                        "Changes detected in submodules; run `git add . && git commit -m \"chore: update submodules\"` to commit them"
                    );
                } else {
                    info!("All submodules are up to date");
                }
                Some(dirty)
            }
            _ => {
                info!("Git status check skipped");
                None
            }
        }
    }
}
