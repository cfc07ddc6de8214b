//! Deployment environment resolution.
//!
//! Two signal sets exist: the branch name (pre-commit helper) and the
//! deployment platform variables (deploy-time generator). Both implement
//! [`EnvironmentResolver`], so the routing generator only ever sees an
//! [`EnvironmentKind`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ChassisError;

/// Git ref of the deployment (`VERCEL_GIT_COMMIT_REF`).
pub const GIT_REF_VAR: &str = "VERCEL_GIT_COMMIT_REF";
/// Platform environment label (`production`, `preview`, `development`).
pub const PLATFORM_ENV_VAR: &str = "VERCEL_ENV";
/// Deployed URL of the build.
pub const DEPLOY_URL_VAR: &str = "VERCEL_URL";

/// Substring that marks a ref or URL as staging.
const STAGING_MARKER: &str = "staging";

/// Deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentKind {
    Production,
    Staging,
}

impl EnvironmentKind {
    pub const ALL: [EnvironmentKind; 2] = [EnvironmentKind::Production, EnvironmentKind::Staging];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::Production => "production",
            EnvironmentKind::Staging => "staging",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentKind {
    type Err = ChassisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(EnvironmentKind::Production),
            "staging" | "stage" => Ok(EnvironmentKind::Staging),
            other => Err(ChassisError::Config(format!("unknown environment: {other}"))),
        }
    }
}

/// Anything that can decide the deployment target.
pub trait EnvironmentResolver {
    fn resolve(&self) -> EnvironmentKind;
}

/// Explicitly chosen environment (`--env`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEnvironment(pub EnvironmentKind);

impl EnvironmentResolver for FixedEnvironment {
    fn resolve(&self) -> EnvironmentKind {
        self.0
    }
}

/// Resolution from a branch name.
///
/// Precedence: staging branch, then production branches, then default to
/// production with an advisory notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchResolver {
    branch: Option<String>,
    staging_branch: String,
    production_branches: Vec<String>,
}

impl BranchResolver {
    pub fn new(
        branch: Option<String>,
        staging_branch: impl Into<String>,
        production_branches: Vec<String>,
    ) -> Self {
        Self {
            branch,
            staging_branch: staging_branch.into(),
            production_branches,
        }
    }

    /// `staging` → staging, `main`/`master` → production.
    pub fn with_default_branches(branch: Option<String>) -> Self {
        Self::new(
            branch,
            "staging",
            vec!["main".to_string(), "master".to_string()],
        )
    }
}

impl EnvironmentResolver for BranchResolver {
    fn resolve(&self) -> EnvironmentKind {
        let kind = match self.branch.as_deref() {
            Some(branch) if branch == self.staging_branch => EnvironmentKind::Staging,
            Some(branch) if self.production_branches.iter().any(|b| b == branch) => {
                EnvironmentKind::Production
            }
            other => {
                warn!(
                    branch = other.unwrap_or("<none>"),
                    "Unknown branch, defaulting to production environment"
                );
                EnvironmentKind::Production
            }
        };
        info!(branch = ?self.branch, environment = %kind, "Resolved environment from branch");
        kind
    }
}

/// Resolution from deployment platform variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentResolver {
    pub platform_env: Option<String>,
    pub git_ref: Option<String>,
    pub deployment_url: Option<String>,
}

impl DeploymentResolver {
    /// Read the platform variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the platform variables through `lookup` (testable without
    /// touching the process environment).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            platform_env: non_empty(PLATFORM_ENV_VAR),
            git_ref: non_empty(GIT_REF_VAR),
            deployment_url: non_empty(DEPLOY_URL_VAR),
        }
    }

    /// Whether any deployment variable is present.
    pub fn has_signals(&self) -> bool {
        self.platform_env.is_some() || self.git_ref.is_some() || self.deployment_url.is_some()
    }

    fn is_preview(&self) -> bool {
        self.platform_env.as_deref() == Some("preview")
    }
}

impl EnvironmentResolver for DeploymentResolver {
    fn resolve(&self) -> EnvironmentKind {
        let ref_is_staging = self
            .git_ref
            .as_deref()
            .is_some_and(|r| r.contains(STAGING_MARKER));
        let url_is_staging = self
            .deployment_url
            .as_deref()
            .is_some_and(|u| u.contains(STAGING_MARKER));

        debug!(
            platform_env = ?self.platform_env,
            git_ref = ?self.git_ref,
            deployment_url = ?self.deployment_url,
            preview = self.is_preview(),
            "Deployment signals"
        );

        let kind = if ref_is_staging || url_is_staging {
            EnvironmentKind::Staging
        } else {
            EnvironmentKind::Production
        };
        info!(environment = %kind, "Resolved environment from deployment signals");
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_branch_resolution_precedence() {
        let resolve = |b: Option<&str>| {
            BranchResolver::with_default_branches(b.map(str::to_string)).resolve()
        };
        assert_eq!(resolve(Some("staging")), EnvironmentKind::Staging);
        assert_eq!(resolve(Some("main")), EnvironmentKind::Production);
        assert_eq!(resolve(Some("master")), EnvironmentKind::Production);
        assert_eq!(resolve(Some("feature/nav")), EnvironmentKind::Production);
        assert_eq!(resolve(None), EnvironmentKind::Production);
    }

    #[test]
    fn test_branch_resolution_is_exact_match() {
        let resolver = BranchResolver::with_default_branches(Some("staging-hotfix".to_string()));
        assert_eq!(resolver.resolve(), EnvironmentKind::Production);
    }

    #[test]
    fn test_deployment_staging_ref() {
        let resolver = DeploymentResolver::from_lookup(lookup(&[
            (PLATFORM_ENV_VAR, "preview"),
            (GIT_REF_VAR, "staging"),
        ]));
        assert_eq!(resolver.resolve(), EnvironmentKind::Staging);
    }

    #[test]
    fn test_deployment_staging_url() {
        let resolver = DeploymentResolver::from_lookup(lookup(&[
            (PLATFORM_ENV_VAR, "preview"),
            (GIT_REF_VAR, "feature/x"),
            (DEPLOY_URL_VAR, "chassis-docs-git-staging-team.vercel.app"),
        ]));
        assert_eq!(resolver.resolve(), EnvironmentKind::Staging);
    }

    #[test]
    fn test_preview_alone_is_production() {
        let resolver = DeploymentResolver::from_lookup(lookup(&[
            (PLATFORM_ENV_VAR, "preview"),
            (GIT_REF_VAR, "feature/x"),
            (DEPLOY_URL_VAR, "chassis-docs-abc123.vercel.app"),
        ]));
        assert_eq!(resolver.resolve(), EnvironmentKind::Production);
    }

    #[test]
    fn test_deployment_signals_presence() {
        assert!(!DeploymentResolver::from_lookup(lookup(&[(GIT_REF_VAR, " ")])).has_signals());
        assert!(DeploymentResolver::from_lookup(lookup(&[(PLATFORM_ENV_VAR, "production")]))
            .has_signals());
    }

    #[test]
    fn test_resolvers_are_interchangeable() {
        let resolvers: Vec<Box<dyn EnvironmentResolver>> = vec![
            Box::new(FixedEnvironment(EnvironmentKind::Staging)),
            Box::new(BranchResolver::with_default_branches(Some("staging".to_string()))),
            Box::new(DeploymentResolver::from_lookup(lookup(&[(GIT_REF_VAR, "staging")]))),
        ];
        assert!(resolvers
            .iter()
            .all(|r| r.resolve() == EnvironmentKind::Staging));
    }

    #[test]
    fn test_environment_kind_from_str() {
        assert_eq!("Staging".parse::<EnvironmentKind>().unwrap(), EnvironmentKind::Staging);
        assert_eq!("prod".parse::<EnvironmentKind>().unwrap(), EnvironmentKind::Production);
        assert!("qa".parse::<EnvironmentKind>().is_err());
    }
}
