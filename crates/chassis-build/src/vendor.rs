//! Vendor asset update strategies.
//!
//! The direct update checks out, installs and builds the vendor target in
//! place. When it fails, the orchestrator falls back to the configured sync
//! strategy: the built-in submodule sync engine or an external script.

use chassis_core::{
    git, BuildConfig, CommandRunner, CommandSpec, FallbackOutcome, FallbackStrategy, Result,
    SubmoduleSyncEngine, SyncReport,
};
use serde::{Deserialize, Serialize};

use crate::pipeline::{BuildPipeline, PipelineReport};
use crate::stage::BuildStage;

/// What brought the vendor assets up to date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum VendorUpdate {
    /// Direct update and build of the vendor target.
    Direct(PipelineReport),
    /// Built-in submodule sync.
    Synced(SyncReport),
    /// External sync script.
    Script(PipelineReport),
}

/// Vendor update result, tagged with the strategy that produced it.
pub type VendorReport = FallbackOutcome<VendorUpdate>;

/// Remote the vendor branch is pulled from.
const VENDOR_REMOTE: &str = "origin";

/// Primary strategy: update, check out, install and build the vendor target.
pub fn direct_update_pipeline(config: &BuildConfig) -> Result<BuildPipeline> {
    let vendor = &config.vendor;
    let vendor_path = config.vendor_path();

    Ok(BuildPipeline::new("vendor")
        .stage(BuildStage::new(
            "submodule_update",
            git::submodule_update_init_remote(&vendor.path).in_dir(&config.root),
        ))
        .stage(
            BuildStage::new(
                "checkout",
                git::checkout(&vendor.path, &vendor.branch).in_dir(&config.root),
            )
            .advisory(),
        )
        .stage(
            BuildStage::new(
                "pull",
                git::pull(&vendor.path, VENDOR_REMOTE, &vendor.branch).in_dir(&config.root),
            )
            .advisory(),
        )
        .stage(
            BuildStage::new(
                "vendor_install",
                CommandSpec::from_argv(&vendor.install)?.in_dir(&vendor_path),
            )
            .requires_dir(&vendor_path),
        )
        .stage(
            BuildStage::new(
                "vendor_build",
                CommandSpec::from_argv(&vendor.build)?.in_dir(&vendor_path),
            )
            .requires_dir(&vendor_path),
        )
        .verify_output(config.vendor_expected_output()))
}

/// Display name of the configured secondary strategy.
pub fn fallback_name(config: &BuildConfig) -> &'static str {
    match config.vendor.fallback {
        FallbackStrategy::Builtin => "submodule sync",
        FallbackStrategy::Script { .. } => "sync script",
    }
}

/// Secondary strategy.
///
/// The built-in engine never fails as a whole (per-submodule failures are
/// recorded in its report). The script fails on a non-zero exit.
pub async fn run_fallback(config: &BuildConfig, runner: &dyn CommandRunner) -> Result<VendorUpdate> {
    match &config.vendor.fallback {
        FallbackStrategy::Builtin => {
            let engine = SubmoduleSyncEngine::new(&config.root, config.submodule_registry()?)
                .with_mode(config.submodules.sync_mode);
            Ok(VendorUpdate::Synced(engine.sync(runner).await))
        }
        FallbackStrategy::Script { command } => {
            let pipeline = BuildPipeline::new("sync_script").stage(BuildStage::new(
                "sync_script",
                CommandSpec::from_argv(command)?.in_dir(&config.root),
            ));
            Ok(VendorUpdate::Script(pipeline.run(runner).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_update_stages() {
        let config = BuildConfig::with_root("/work");
        let pipeline = direct_update_pipeline(&config).unwrap();

        let names: Vec<&str> = pipeline.stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["submodule_update", "checkout", "pull", "vendor_install", "vendor_build"]
        );
        let advisory: Vec<bool> = pipeline.stages.iter().map(|s| s.advisory).collect();
        assert_eq!(advisory, vec![false, true, true, false, false]);
        assert_eq!(
            pipeline.stages[2].command.to_string(),
            "git -C vendor/assets pull origin app/docs"
        );
        assert_eq!(
            pipeline.verify.as_deref(),
            Some(std::path::Path::new("/work/vendor/assets/dist/web/chassis-docs"))
        );
    }

    #[test]
    fn test_fallback_names() {
        let mut config = BuildConfig::default();
        assert_eq!(fallback_name(&config), "submodule sync");
        config.vendor.fallback = FallbackStrategy::Script {
            command: vec!["npm".into(), "run".into(), "sync:submodules".into()],
        };
        assert_eq!(fallback_name(&config), "sync script");
    }
}
