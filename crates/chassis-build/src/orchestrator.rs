//! Build orchestration for the docs site.
//!
//! [`Orchestrator::build_all`] runs the full sequence: dependency check,
//! vendor assets (direct update with fallback), site build, validation.
//! Every operation is also available on its own through [`Operation`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chassis_core::workspace::remove_if_exists;
use chassis_core::{
    BuildConfig, ChassisError, CommandRunner, CommandSpec, DirectoryCheck, FallbackChain, Result,
    StrategyUsed, SubmoduleSyncEngine, SyncReport, WorkspaceInspector,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::pipeline::{BuildPipeline, PipelineReport};
use crate::stage::BuildStage;
use crate::vendor::{self, VendorReport};

/// Top-level operations of the build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    All,
    Site,
    Vendor,
    Clean,
    Validate,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::All => "all",
            Operation::Site => "site",
            Operation::Vendor => "vendor",
            Operation::Clean => "clean",
            Operation::Validate => "validate",
        }
    }
}

/// Outcome of [`Orchestrator::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<DirectoryCheck>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.present)
    }

    pub fn missing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.present)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Outcome of a complete [`Orchestrator::build_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub dependencies: Vec<DirectoryCheck>,
    pub vendor: VendorReport,
    pub site: PipelineReport,
    pub validation: ValidationReport,
    pub duration_ms: u64,
}

/// Result of [`Orchestrator::execute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", content = "report", rename_all = "snake_case")]
pub enum OperationReport {
    All(Box<BuildReport>),
    Site(PipelineReport),
    Vendor(VendorReport),
    Clean(Vec<PathBuf>),
    Validate(ValidationReport),
}

/// Drives the build stages against a shared, immutable [`BuildConfig`].
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<BuildConfig>,
    runner: Arc<dyn CommandRunner>,
    strict_validation: bool,
}

impl Orchestrator {
    pub fn new(config: Arc<BuildConfig>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            runner,
            strict_validation: false,
        }
    }

    /// Make missing validation targets fatal.
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Dispatch one operation.
    pub async fn execute(&self, operation: Operation) -> Result<OperationReport> {
        info!(operation = operation.name(), "Running operation");
        match operation {
            Operation::All => Ok(OperationReport::All(Box::new(self.build_all().await?))),
            Operation::Site => Ok(OperationReport::Site(self.build_site().await?)),
            Operation::Vendor => Ok(OperationReport::Vendor(self.build_vendor_assets().await?)),
            Operation::Clean => Ok(OperationReport::Clean(self.clean()?)),
            Operation::Validate => Ok(OperationReport::Validate(
                self.validate(self.strict_validation)?,
            )),
        }
    }

    /// Advisory check of the vendor and site directories.
    pub fn check_dependencies(&self) -> Vec<DirectoryCheck> {
        WorkspaceInspector::inspect(&[
            (self.config.vendor_dir(), "vendor (submodules)".to_string()),
            (self.config.site_dir(), "site (Astro project)".to_string()),
        ])
    }

    /// Update the vendor target directly, falling back to the sync strategy.
    pub async fn build_vendor_assets(&self) -> Result<VendorReport> {
        info!(
            vendor = %self.config.vendor.name,
            path = %self.config.vendor.path,
            "Updating vendor assets"
        );

        let chain = FallbackChain::new("direct update", vendor::fallback_name(&self.config));
        let runner = self.runner.as_ref();
        let config = self.config.as_ref();

        let outcome = chain
            .run(
                || async move {
                    let pipeline = vendor::direct_update_pipeline(config)?;
                    pipeline.run(runner).await.map(vendor::VendorUpdate::Direct)
                },
                || vendor::run_fallback(config, runner),
            )
            .await?;

        match outcome.used {
            StrategyUsed::Primary => info!("Vendor assets updated and built successfully"),
            StrategyUsed::Secondary => info!("Vendor assets synced via fallback"),
        }
        Ok(outcome)
    }

    /// Install, build and relocate the site output.
    pub async fn build_site(&self) -> Result<PipelineReport> {
        info!("Building documentation site");
        let config = &self.config;
        let site_dir = config.site_dir();

        let pipeline = BuildPipeline::new("site")
            .stage(
                BuildStage::new(
                    "site_install",
                    CommandSpec::from_argv(&config.site.install)?.in_dir(&config.root),
                )
                .requires_dir(&site_dir),
            )
            .stage(BuildStage::new(
                "site_build",
                CommandSpec::from_argv(&config.site.build)?.in_dir(&config.root),
            ))
            .relocate(config.site_dist(), config.output_dir());

        let report = pipeline.run(self.runner.as_ref()).await?;
        info!(output = %config.output_dir().display(), "Site built successfully");
        Ok(report)
    }

    /// Check the build output and vendor directories.
    ///
    /// Missing entries are logged. With `strict` they are also fatal.
    pub fn validate(&self, strict: bool) -> Result<ValidationReport> {
        info!(strict, "Validating build");
        let checks: Vec<DirectoryCheck> = [
            (
                self.config.output_dir(),
                format!("Site build output ({})", self.config.workspace.output_dir),
            ),
            (self.config.vendor_dir(), "Vendor submodules".to_string()),
        ]
        .into_iter()
        .map(|(path, name)| {
            let present = path.exists();
            if present {
                info!("✓ {name}");
            } else {
                error!("✗ {name}");
            }
            DirectoryCheck {
                name,
                path,
                present,
            }
        })
        .collect();

        let report = ValidationReport { checks };
        if strict && !report.passed() {
            return Err(ChassisError::ValidationFailed(report.missing().join(", ")));
        }
        Ok(report)
    }

    /// Remove build output and installed dependencies.
    pub fn clean(&self) -> Result<Vec<PathBuf>> {
        info!("Cleaning build artifacts");
        let root = &self.config.root;
        let mut removed = Vec::new();
        for path in [
            self.config.output_dir(),
            root.join("node_modules"),
            self.config.site_dir().join("node_modules"),
        ] {
            if remove_if_exists(&path)? {
                let relative = path.strip_prefix(root).unwrap_or(path.as_path());
                info!(path = %relative.display(), "Cleaned");
                removed.push(path);
            }
        }
        Ok(removed)
    }

    /// Sync every registered submodule. Never fails on per-submodule problems.
    pub async fn sync_submodules(&self) -> Result<SyncReport> {
        let engine = SubmoduleSyncEngine::new(&self.config.root, self.config.submodule_registry()?)
            .with_mode(self.config.submodules.sync_mode);
        Ok(engine.sync(self.runner.as_ref()).await)
    }

    /// Full build: dependencies, vendor assets, site, validation.
    pub async fn build_all(&self) -> Result<BuildReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(run_id = %run_id, "Starting complete build process");

        let result = async {
            let dependencies = self.check_dependencies();
            let vendor = self.build_vendor_assets().await?;
            let site = self.build_site().await?;
            let validation = self.validate(self.strict_validation)?;
            Ok::<_, ChassisError>((dependencies, vendor, site, validation))
        }
        .await;

        let (dependencies, vendor, site, validation) = result.map_err(|e| {
            error!(run_id = %run_id, error = %e, "Build failed");
            e
        })?;

        if !validation.passed() {
            warn!(missing = %validation.missing().join(", "), "Build finished with missing outputs");
        }
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, duration_ms, "Build completed successfully");

        Ok(BuildReport {
            run_id,
            started_at,
            dependencies,
            vendor,
            site,
            validation,
            duration_ms,
        })
    }
}
