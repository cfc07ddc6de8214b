//! Chassis - build and deploy orchestrator CLI
//!
//! The `chassis` command builds the Chassis documentation site and prepares
//! its deployment configuration.
//!
//! ## Commands
//!
//! - `all` (default): vendor assets, site build, validation
//! - `site` / `vendor` / `clean` / `validate`: single build steps
//! - `sync`: update every submodule, keeping local changes
//! - `routing`: regenerate the deployment routing config
//! - `prepare-deploy`: fill the routing template for the current branch

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, warn, Level};

use chassis_build::{
    Operation, OperationReport, Orchestrator, PipelineReport, ValidationReport, VendorReport,
    VendorUpdate,
};
use chassis_core::{
    current_branch, is_git_repo, BuildConfig, DeploymentResolver, EnvironmentKind, EnvironmentResolver,
    FixedEnvironment, ProcessRunner, RoutingReport, StrategyUsed, SyncMode, SyncReport,
    SyncStatus,
};

#[derive(Parser)]
#[command(name = "chassis")]
#[command(author = "Chassis Maintainers")]
#[command(version = chassis_core::VERSION)]
#[command(about = "Build and deploy orchestrator for the Chassis docs site", long_about = None)]
struct Cli {
    /// Workspace root
    #[arg(long, global = true, env = "CHASSIS_ROOT", default_value = ".")]
    root: PathBuf,

    /// Config file (default: <root>/chassis.toml when present)
    #[arg(long, global = true, env = "CHASSIS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines and JSON reports
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the complete build: vendor assets, site, validation
    All {
        /// Fail when validation finds missing outputs
        #[arg(long)]
        strict: bool,
    },

    /// Build the site and copy its output to the output directory
    Site,

    /// Update and build vendor assets, falling back to submodule sync
    Vendor,

    /// Remove build output and installed dependencies
    Clean,

    /// Check that build output and vendor directories exist
    Validate {
        /// Exit non-zero when anything is missing
        #[arg(long)]
        strict: bool,
    },

    /// Sync all submodules with their remotes, keeping local changes
    Sync {
        /// Update all submodules at once
        #[arg(long)]
        concurrent: bool,
    },

    /// Regenerate the deployment routing config
    Routing {
        /// Build the config from the rewrite rules instead of a template
        #[arg(long)]
        structured: bool,

        /// Target environment (default: resolved from deployment variables or branch)
        #[arg(long)]
        env: Option<EnvironmentKind>,

        /// Template to render (default: the output file itself)
        #[arg(long, conflicts_with = "structured")]
        template: Option<PathBuf>,

        /// Output file (default: routing.output from the config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate the routing config for the current branch before committing
    PrepareDeploy {
        /// Branch to prepare for (default: the checked-out branch)
        #[arg(long)]
        branch: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    chassis_core::init_tracing(cli.json, level);

    exit_status(run(cli).await)
}

/// Log a fatal error once, with its full context chain.
fn exit_status(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "chassis failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Workspace root {} not found", cli.root.display()))?;
    let config = BuildConfig::load(&root, cli.config.as_deref())
        .context("Failed to load build configuration")?;
    let json = cli.json;

    match cli.command.unwrap_or(Commands::All { strict: false }) {
        Commands::All { strict } => cmd_operation(config, Operation::All, strict, json).await,
        Commands::Site => cmd_operation(config, Operation::Site, false, json).await,
        Commands::Vendor => cmd_operation(config, Operation::Vendor, false, json).await,
        Commands::Clean => cmd_operation(config, Operation::Clean, false, json).await,
        Commands::Validate { strict } => {
            cmd_operation(config, Operation::Validate, strict, json).await
        }
        Commands::Sync { concurrent } => cmd_sync(config, concurrent, json).await,
        Commands::Routing {
            structured,
            env,
            template,
            output,
        } => cmd_routing(
            &config,
            structured,
            env,
            template.as_deref(),
            output.as_deref(),
            json,
        ),
        Commands::PrepareDeploy { branch } => cmd_prepare_deploy(&config, branch, json),
    }
}

fn orchestrator(config: BuildConfig) -> Orchestrator {
    let runner = Arc::new(ProcessRunner::new(
        &config.root,
        config.workspace.command_timeout_secs,
    ));
    Orchestrator::new(Arc::new(config), runner)
}

async fn cmd_operation(
    config: BuildConfig,
    operation: Operation,
    strict: bool,
    json: bool,
) -> Result<()> {
    let report = orchestrator(config)
        .with_strict_validation(strict)
        .execute(operation)
        .await
        .with_context(|| format!("`chassis {}` failed", operation.name()))?;

    if json {
        return print_json(&report);
    }

    match &report {
        OperationReport::All(build) => {
            println!("Run ID: {}", build.run_id);
            print_vendor(&build.vendor);
            print_pipeline(&build.site);
            print_validation(&build.validation);
            println!();
            println!("✓ Build completed successfully ({}ms)", build.duration_ms);
        }
        OperationReport::Site(site) => print_pipeline(site),
        OperationReport::Vendor(vendor) => print_vendor(vendor),
        OperationReport::Clean(removed) => {
            println!("✓ Cleaned {} path(s)", removed.len());
        }
        OperationReport::Validate(validation) => print_validation(validation),
    }
    Ok(())
}

async fn cmd_sync(mut config: BuildConfig, concurrent: bool, json: bool) -> Result<()> {
    if concurrent {
        config.submodules.sync_mode = SyncMode::Concurrent;
    }
    let report = orchestrator(config)
        .sync_submodules()
        .await
        .context("Submodule sync failed")?;

    if json {
        print_json(&report)
    } else {
        print_sync(&report);
        Ok(())
    }
}

fn cmd_routing(
    config: &BuildConfig,
    structured: bool,
    env: Option<EnvironmentKind>,
    template: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let environment = resolve_environment(env, &DeploymentResolver::from_env(), config);
    let output = config.resolve(output.unwrap_or(Path::new(&config.routing.output)));

    let generated = if structured {
        config.structured_generator()?.write(&output, environment)
    } else {
        let source = template.map_or_else(|| output.clone(), |t| config.resolve(t));
        config
            .template_generator()?
            .regenerate(&source, &output, environment)
    };
    let report =
        generated.with_context(|| format!("Failed to generate {}", output.display()))?;

    if json {
        print_json(&report)
    } else {
        print_routing(&report);
        Ok(())
    }
}

fn cmd_prepare_deploy(config: &BuildConfig, branch: Option<String>, json: bool) -> Result<()> {
    let branch = match branch {
        Some(branch) => Some(branch),
        None if !is_git_repo(&config.root) => bail!(
            "{} is not a git repository; pass --branch to choose the deployment",
            config.root.display()
        ),
        None => current_branch(&config.root).context("Error getting current branch")?,
    };
    let environment = config.branch_resolver(branch.clone()).resolve();

    let template = config.resolve(&config.routing.template);
    let output = config.resolve(&config.routing.output);
    let report = config
        .template_generator()?
        .regenerate(&template, &output, environment)
        .with_context(|| format!("Failed to generate {}", output.display()))?;

    if json {
        return print_json(&report);
    }

    println!("Current branch: {}", branch.as_deref().unwrap_or("(detached HEAD)"));
    println!("Environment: {}", environment.as_str().to_uppercase());
    print_routing(&report);
    println!();
    println!("Remember to commit the updated {}:", config.routing.output);
    println!("   git add {}", config.routing.output);
    println!(
        "   git commit -m \"Update {} for {} deployment\"",
        config.routing.output, environment
    );
    Ok(())
}

/// Explicit flag, then deployment variables, then the checked-out branch.
fn resolve_environment(
    explicit: Option<EnvironmentKind>,
    deployment: &DeploymentResolver,
    config: &BuildConfig,
) -> EnvironmentKind {
    if let Some(kind) = explicit {
        return FixedEnvironment(kind).resolve();
    }
    if deployment.has_signals() {
        return deployment.resolve();
    }
    let branch = current_branch(&config.root).unwrap_or_else(|e| {
        warn!(error = %e, "Could not determine current branch");
        None
    });
    config.branch_resolver(branch).resolve()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_pipeline(report: &PipelineReport) {
    println!();
    println!("Pipeline: {} ({}ms)", report.pipeline, report.duration_ms);
    for stage in &report.stages {
        let status = if stage.passed() { "✓" } else { "✗" };
        println!(
            "  {} {} ({}ms, exit code: {})",
            status, stage.stage_name, stage.duration_ms, stage.exit_code
        );
    }
    if let Some(dest) = &report.relocated {
        println!("  → {}", dest.display());
    }
    println!(
        "Summary: {}/{} stages passed",
        report.passed_count(),
        report.stages.len()
    );
}

fn print_vendor(report: &VendorReport) {
    match report.used {
        StrategyUsed::Primary => println!("Vendor assets: updated directly"),
        StrategyUsed::Secondary => {
            println!("Vendor assets: updated via fallback");
            if let Some(err) = &report.primary_error {
                println!("  primary failure: {err}");
            }
        }
    }
    match &report.value {
        VendorUpdate::Direct(pipeline) | VendorUpdate::Script(pipeline) => print_pipeline(pipeline),
        VendorUpdate::Synced(sync) => print_sync(sync),
    }
}

fn print_sync(report: &SyncReport) {
    println!();
    for outcome in &report.outcomes {
        let (status, label) = match outcome.status {
            SyncStatus::Synced => ("✓", "synced"),
            SyncStatus::SkippedLocalChanges => ("⚠", "kept local changes"),
            SyncStatus::Missing => ("✗", "not found"),
        };
        println!("  {} {} ({}): {}", status, outcome.name, outcome.path, label);
    }
    match report.pending_changes {
        Some(true) => println!("Changes detected in submodules; commit them when ready"),
        Some(false) => println!("All submodules are up to date"),
        None => println!("Git status check skipped"),
    }
}

fn print_validation(report: &ValidationReport) {
    println!();
    for check in &report.checks {
        let status = if check.present { "✓" } else { "✗" };
        println!("  {} {}", status, check.name);
    }
}

fn print_routing(report: &RoutingReport) {
    let state = if report.changed { "written" } else { "unchanged" };
    println!(
        "✓ {} for {} ({}, sha256 {})",
        report.output.display(),
        report.environment,
        state,
        &report.digest[..12]
    );
    for name in &report.unmanaged {
        println!("  ⚠ {{{{{name}}}}} has no registered endpoint");
    }
}
