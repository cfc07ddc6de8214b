//! Integration tests for the build orchestrator.

use std::path::Path;
use std::sync::Arc;

use chassis_build::{Operation, OperationReport, Orchestrator, VendorUpdate};
use chassis_core::fakes::ScriptedRunner;
use chassis_core::{BuildConfig, ChassisError, FallbackStrategy, StrategyUsed, SyncStatus};

/// Lay out a workspace with a site build output and a vendor checkout.
fn workspace(root: &Path) {
    std::fs::create_dir_all(root.join("site/dist/docs")).unwrap();
    std::fs::write(root.join("site/dist/docs/index.html"), "<h1>Chassis</h1>").unwrap();
    std::fs::create_dir_all(root.join("vendor/assets")).unwrap();
    std::fs::create_dir_all(root.join("vendor/css")).unwrap();
}

fn orchestrator(config: BuildConfig, runner: Arc<ScriptedRunner>) -> Orchestrator {
    Orchestrator::new(Arc::new(config), runner)
}

/// Test: full build runs vendor, site and validation in order
#[tokio::test]
async fn test_build_all_success() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let runner = Arc::new(ScriptedRunner::new());
    let orch = orchestrator(BuildConfig::with_root(dir.path()), runner.clone());

    let report = orch.build_all().await.expect("build failed");

    assert_eq!(report.vendor.used, StrategyUsed::Primary);
    assert!(matches!(report.vendor.value, VendorUpdate::Direct(_)));
    assert_eq!(report.site.relocated.as_deref(), Some(dir.path().join("_site").as_path()));
    assert!(report.validation.passed());
    assert!(report.dependencies.iter().all(|d| d.present));
    assert!(dir.path().join("_site/docs/index.html").is_file());

    assert_eq!(
        runner.command_lines(),
        vec![
            "git submodule update --init --remote vendor/assets",
            "git -C vendor/assets checkout app/docs",
            "git -C vendor/assets pull origin app/docs",
            "pnpm install",
            "pnpm build",
            "pnpm install",
            "pnpm build:site",
        ]
    );
    let calls = runner.calls();
    assert_eq!(calls[3].cwd.as_deref(), Some(dir.path().join("vendor/assets").as_path()));
    assert_eq!(calls[5].cwd.as_deref(), Some(dir.path()));
}

/// Test: a failed direct update falls back to the built-in submodule sync
#[tokio::test]
async fn test_vendor_falls_back_to_submodule_sync() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let runner = Arc::new(ScriptedRunner::new().fail_on_in(
        &dir.path().join("vendor/assets"),
        "pnpm build",
        2,
        "error TS2307: Cannot find module",
    ));
    let orch = orchestrator(BuildConfig::with_root(dir.path()), runner.clone());

    let report = orch.build_vendor_assets().await.expect("fallback should succeed");

    assert_eq!(report.used, StrategyUsed::Secondary);
    assert!(report.primary_error.as_deref().unwrap().contains("TS2307"));
    let VendorUpdate::Synced(sync) = &report.value else {
        panic!("expected submodule sync, got {:?}", report.value);
    };
    assert_eq!(sync.outcome("chassis-tokens").unwrap().status, SyncStatus::Missing);
    assert_eq!(sync.outcome("chassis-css").unwrap().status, SyncStatus::Synced);
    assert_eq!(sync.outcome("chassis-assets").unwrap().status, SyncStatus::Synced);
}

/// Test: both strategies failing keeps both causes and stops the build
#[tokio::test]
async fn test_both_strategies_fail() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let mut config = BuildConfig::with_root(dir.path());
    config.vendor.fallback = FallbackStrategy::Script {
        command: vec!["npm".into(), "run".into(), "sync:submodules".into()],
    };
    let runner = Arc::new(
        ScriptedRunner::new()
            .fail_on("git submodule update --init --remote", 1, "fatal: unable to access remote")
            .fail_on("npm run sync:submodules", 1, "npm ERR! missing script"),
    );
    let orch = orchestrator(config, runner.clone());

    let err = orch.build_all().await.unwrap_err();

    assert!(matches!(err, ChassisError::FallbackExhausted(_)));
    let msg = err.to_string();
    assert!(msg.contains("unable to access remote"), "got: {msg}");
    assert!(msg.contains("missing script"), "got: {msg}");
    assert_eq!(runner.count("pnpm build:site"), 0, "site must not be built");
    assert!(!dir.path().join("_site").exists());
}

/// Test: the script fallback succeeds after a primary failure
#[tokio::test]
async fn test_script_fallback_success() {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path());
    let mut config = BuildConfig::with_root(dir.path());
    config.vendor.fallback = FallbackStrategy::Script {
        command: vec!["npm".into(), "run".into(), "sync:submodules".into()],
    };
    let runner = Arc::new(ScriptedRunner::new().spawn_error_on("git submodule update"));
    let orch = orchestrator(config, runner.clone());

    let report = orch.build_vendor_assets().await.unwrap();
    assert_eq!(report.used, StrategyUsed::Secondary);
    assert!(matches!(report.value, VendorUpdate::Script(_)));
    assert_eq!(runner.count("npm run sync:submodules"), 1);
}

/// Test: site build refuses to run without a site directory
#[tokio::test]
async fn test_site_requires_site_dir() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let orch = orchestrator(BuildConfig::with_root(dir.path()), runner.clone());

    let err = orch.execute(Operation::Site).await.unwrap_err();

    assert!(matches!(err, ChassisError::PreconditionFailed { .. }));
    assert!(runner.calls().is_empty());
}

/// Test: strict validation turns missing output into an error
#[tokio::test]
async fn test_validate_operation_strictness() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(ScriptedRunner::new());

    let advisory = orchestrator(BuildConfig::with_root(dir.path()), runner.clone());
    let OperationReport::Validate(report) = advisory.execute(Operation::Validate).await.unwrap()
    else {
        panic!("expected a validation report");
    };
    assert_eq!(report.missing().len(), 2);

    let strict = orchestrator(BuildConfig::with_root(dir.path()), runner.clone())
        .with_strict_validation(true);
    let err = strict.execute(Operation::Validate).await.unwrap_err();
    assert!(matches!(err, ChassisError::ValidationFailed(_)));
}

/// Test: clean removes output and dependency directories
#[tokio::test]
async fn test_clean_operation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("_site")).unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/.pnpm")).unwrap();
    let orch = orchestrator(BuildConfig::with_root(dir.path()), Arc::new(ScriptedRunner::new()));

    let OperationReport::Clean(removed) = orch.execute(Operation::Clean).await.unwrap() else {
        panic!("expected a clean report");
    };

    assert_eq!(removed.len(), 2);
    assert!(!dir.path().join("_site").exists());
    assert!(!dir.path().join("node_modules").exists());
}
