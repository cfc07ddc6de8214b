//! Build configuration.
//!
//! Optional `chassis.toml` at the workspace root. Every field has a default
//! reproducing the Chassis docs layout, so an absent file is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::CommandSpec;
use crate::environment::BranchResolver;
use crate::error::{ChassisError, Result};
use crate::routing::{
    chassis_default_rules, EndpointRegistry, RoutingRule, ServiceEndpoint, StructuredGenerator,
    TemplateGenerator,
};
use crate::submodule::{SubmoduleRegistry, SubmoduleSpec, SyncMode};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "chassis.toml";

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Workspace root all relative paths resolve against. Not read from the
    /// file; set by [`BuildConfig::load`].
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub submodules: SubmodulesConfig,

    #[serde(default)]
    pub vendor: VendorConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub routing: RoutingSettings,
}

/// `[workspace]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,

    #[serde(default = "default_site_dir")]
    pub site_dir: String,

    /// Canonical build output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Per-command timeout in seconds; 0 disables it.
    #[serde(default)]
    pub command_timeout_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            vendor_dir: default_vendor_dir(),
            site_dir: default_site_dir(),
            output_dir: default_output_dir(),
            command_timeout_secs: 0,
        }
    }
}

fn default_vendor_dir() -> String {
    "vendor".into()
}
fn default_site_dir() -> String {
    "site".into()
}
fn default_output_dir() -> String {
    "_site".into()
}

/// `[submodules]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmodulesConfig {
    #[serde(default = "default_submodules")]
    pub entries: Vec<SubmoduleSpec>,

    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl Default for SubmodulesConfig {
    fn default() -> Self {
        Self {
            entries: default_submodules(),
            sync_mode: SyncMode::default(),
        }
    }
}

fn default_submodules() -> Vec<SubmoduleSpec> {
    vec![
        SubmoduleSpec::new("chassis-tokens", "vendor/tokens"),
        SubmoduleSpec::new("chassis-css", "vendor/css"),
        SubmoduleSpec::new("chassis-assets", "vendor/assets"),
    ]
}

/// Strategy used when the direct vendor update fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// The in-process submodule sync engine.
    #[default]
    Builtin,
    /// An external sync script, run at the workspace root.
    Script {
        #[serde(default = "default_sync_script")]
        command: Vec<String>,
    },
}

fn default_sync_script() -> Vec<String> {
    argv(&["npm", "run", "sync:submodules"])
}

/// `[vendor]` section: the submodule whose assets the site consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_name")]
    pub name: String,

    #[serde(default = "default_vendor_path")]
    pub path: String,

    /// Branch checked out and pulled before building.
    #[serde(default = "default_vendor_branch")]
    pub branch: String,

    #[serde(default = "default_install")]
    pub install: Vec<String>,

    #[serde(default = "default_vendor_build")]
    pub build: Vec<String>,

    /// Directory expected inside `path` after the build.
    #[serde(default = "default_expected_output")]
    pub expected_output: String,

    #[serde(default)]
    pub fallback: FallbackStrategy,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            name: default_vendor_name(),
            path: default_vendor_path(),
            branch: default_vendor_branch(),
            install: default_install(),
            build: default_vendor_build(),
            expected_output: default_expected_output(),
            fallback: FallbackStrategy::default(),
        }
    }
}

fn default_vendor_name() -> String {
    "chassis-assets".into()
}
fn default_vendor_path() -> String {
    "vendor/assets".into()
}
fn default_vendor_branch() -> String {
    "app/docs".into()
}
fn default_install() -> Vec<String> {
    argv(&["pnpm", "install"])
}
fn default_vendor_build() -> Vec<String> {
    argv(&["pnpm", "build"])
}
fn default_expected_output() -> String {
    "dist/web/chassis-docs".into()
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_install")]
    pub install: Vec<String>,

    #[serde(default = "default_site_build")]
    pub build: Vec<String>,

    /// Where the site build leaves its output, relative to the root.
    #[serde(default = "default_site_dist")]
    pub dist: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            install: default_install(),
            build: default_site_build(),
            dist: default_site_dist(),
        }
    }
}

fn default_site_build() -> Vec<String> {
    argv(&["pnpm", "build:site"])
}
fn default_site_dist() -> String {
    "site/dist".into()
}

/// `[routing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default = "default_routing_output")]
    pub output: String,

    #[serde(default = "default_routing_version")]
    pub version: u32,

    #[serde(default = "default_build_command")]
    pub build_command: String,

    #[serde(default = "default_output_dir")]
    pub output_directory: String,

    #[serde(default = "default_staging_branch")]
    pub staging_branch: String,

    #[serde(default = "default_production_branches")]
    pub production_branches: Vec<String>,

    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<ServiceEndpoint>,

    #[serde(default = "chassis_default_rules")]
    pub rules: Vec<RoutingRule>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            template: default_template(),
            output: default_routing_output(),
            version: default_routing_version(),
            build_command: default_build_command(),
            output_directory: default_output_dir(),
            staging_branch: default_staging_branch(),
            production_branches: default_production_branches(),
            endpoints: default_endpoints(),
            rules: chassis_default_rules(),
        }
    }
}

fn default_template() -> String {
    "vercel.template.json".into()
}
fn default_routing_output() -> String {
    "vercel.json".into()
}
fn default_routing_version() -> u32 {
    2
}
fn default_build_command() -> String {
    "chassis routing --structured && pnpm build".into()
}
fn default_staging_branch() -> String {
    "staging".into()
}
fn default_production_branches() -> Vec<String> {
    vec!["main".into(), "master".into()]
}
fn default_endpoints() -> Vec<ServiceEndpoint> {
    EndpointRegistry::chassis_defaults().endpoints().to_vec()
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl BuildConfig {
    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load configuration for the workspace at `root`.
    ///
    /// An explicit `path` must exist. Otherwise `<root>/chassis.toml` is used
    /// when present, and the defaults when not. The result is validated.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                let p = if p.is_absolute() { p.to_path_buf() } else { root.join(p) };
                if !p.is_file() {
                    return Err(ChassisError::Config(format!(
                        "config file {} not found",
                        p.display()
                    )));
                }
                Some(p)
            }
            None => Some(root.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()),
        };

        let mut config = match file {
            Some(p) => {
                debug!(path = %p.display(), "Loading config");
                let content = std::fs::read_to_string(&p)?;
                Self::from_toml_str(&content).map_err(|e| {
                    ChassisError::Config(format!("failed to parse {}: {e}", p.display()))
                })?
            }
            None => {
                debug!(root = %root.display(), "No config file, using defaults");
                Self::default()
            }
        };
        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check every registry and command before anything runs.
    pub fn validate(&self) -> Result<()> {
        self.submodule_registry()?;
        self.structured_generator()?;
        for (what, command) in [
            ("vendor.install", &self.vendor.install),
            ("vendor.build", &self.vendor.build),
            ("site.install", &self.site.install),
            ("site.build", &self.site.build),
        ] {
            CommandSpec::from_argv(command)
                .map_err(|_| ChassisError::Config(format!("{what} must not be empty")))?;
        }
        if let FallbackStrategy::Script { command } = &self.vendor.fallback {
            CommandSpec::from_argv(command).map_err(|_| {
                ChassisError::Config("vendor.fallback.command must not be empty".to_string())
            })?;
        }
        Ok(())
    }

    /// `root` joined with a configured relative path.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn vendor_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.vendor_dir)
    }

    pub fn site_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.site_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.workspace.output_dir)
    }

    pub fn site_dist(&self) -> PathBuf {
        self.resolve(&self.site.dist)
    }

    pub fn vendor_path(&self) -> PathBuf {
        self.resolve(&self.vendor.path)
    }

    pub fn vendor_expected_output(&self) -> PathBuf {
        self.vendor_path().join(&self.vendor.expected_output)
    }

    pub fn submodule_registry(&self) -> Result<SubmoduleRegistry> {
        SubmoduleRegistry::new(self.submodules.entries.clone())
    }

    pub fn endpoint_registry(&self) -> Result<EndpointRegistry> {
        EndpointRegistry::new(
            self.routing
                .endpoints
                .iter()
                .cloned()
                .map(ServiceEndpoint::with_derived_placeholder)
                .collect(),
        )
    }

    pub fn structured_generator(&self) -> Result<StructuredGenerator> {
        StructuredGenerator::new(
            self.endpoint_registry()?,
            self.routing.rules.clone(),
            self.routing.version,
            self.routing.build_command.clone(),
            self.routing.output_directory.clone(),
        )
    }

    pub fn template_generator(&self) -> Result<TemplateGenerator> {
        Ok(TemplateGenerator::new(self.endpoint_registry()?))
    }

    pub fn branch_resolver(&self, branch: Option<String>) -> BranchResolver {
        BranchResolver::new(
            branch,
            self.routing.staging_branch.clone(),
            self.routing.production_branches.clone(),
        )
    }
}
