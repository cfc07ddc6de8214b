//! Chassis Core Library
//!
//! Building blocks for the Chassis build orchestrator: external command
//! execution, submodule sync, fallback chains, environment resolution and
//! routing config generation.

pub mod command;
pub mod config;
pub mod environment;
pub mod error;
pub mod fakes;
pub mod fallback;
pub mod git;
pub mod routing;
pub mod submodule;
pub mod telemetry;
pub mod workspace;

pub use command::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use config::{
    BuildConfig, FallbackStrategy, RoutingSettings, SiteConfig, SubmodulesConfig, VendorConfig,
    WorkspaceConfig, CONFIG_FILE_NAME,
};
pub use environment::{
    BranchResolver, DeploymentResolver, EnvironmentKind, EnvironmentResolver, FixedEnvironment,
};
pub use error::{ChassisError, Result};
pub use fallback::{FallbackChain, FallbackError, FallbackOutcome, StrategyUsed};
pub use git::{current_branch, is_git_repo};
pub use routing::{
    EndpointRegistry, Rendered, Rewrite, RoutingConfig, RoutingReport, RoutingRule,
    ServiceEndpoint, StructuredGenerator, TemplateGenerator,
};
pub use submodule::{
    InitStatus, SubmoduleRegistry, SubmoduleSpec, SubmoduleSyncEngine, SyncMode, SyncOutcome,
    SyncReport, SyncStatus,
};
pub use telemetry::init_tracing;
pub use workspace::{DirectoryCheck, WorkspaceInspector};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
