//! Structural routing generator.
//!
//! Rebuilds the whole [`RoutingConfig`] from the static rule registry on
//! every run. It never reads its previous output, so regeneration is
//! idempotent by construction. This is the preferred variant whenever the
//! file is fully generator-owned.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::endpoint::EndpointRegistry;
use super::{write_output, RoutingReport};
use crate::environment::EnvironmentKind;
use crate::error::{ChassisError, Result};

/// One declared rewrite, resolved against an endpoint at generation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Inbound path pattern (e.g. `/docs/assets/:path*`).
    pub source: String,

    /// Key of the [`super::ServiceEndpoint`] serving it.
    pub endpoint: String,

    /// Path appended to the endpoint URL (e.g. `/:path*`).
    #[serde(default)]
    pub path: String,
}

impl RoutingRule {
    pub fn new(
        source: impl Into<String>,
        endpoint: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            endpoint: endpoint.into(),
            path: path.into(),
        }
    }
}

/// The rewrites served by the Chassis docs site, in match order.
pub fn chassis_default_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule::new("/docs/assets/:path*", "assets", "/:path*"),
        RoutingRule::new("/docs/css/:path*", "css", "/:path*"),
        RoutingRule::new("/docs/tokens/:path*", "tokens", "/:path*"),
        RoutingRule::new("/docs/figma/:path*", "figma", "/:path*"),
        RoutingRule::new("/docs/icons/:path*", "icons", "/docs/icons/:path*"),
        RoutingRule::new("/assets/icons/:path*", "icons", "/assets/:path*"),
    ]
}

/// A resolved rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    pub source: String,
    pub destination: String,
}

/// The generated deployment configuration (`vercel.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub version: u32,
    pub build_command: String,
    pub output_directory: String,
    pub rewrites: Vec<Rewrite>,
}

/// Builds [`RoutingConfig`]s from rules and endpoints.
#[derive(Debug, Clone)]
pub struct StructuredGenerator {
    registry: EndpointRegistry,
    rules: Vec<RoutingRule>,
    version: u32,
    build_command: String,
    output_directory: String,
}

impl StructuredGenerator {
    /// Fails if a rule has an empty source or references an unknown endpoint.
    pub fn new(
        registry: EndpointRegistry,
        rules: Vec<RoutingRule>,
        version: u32,
        build_command: impl Into<String>,
        output_directory: impl Into<String>,
    ) -> Result<Self> {
        for rule in &rules {
            if rule.source.trim().is_empty() {
                return Err(ChassisError::Registry(
                    "rewrite source must not be empty".to_string(),
                ));
            }
            if registry.get(&rule.endpoint).is_none() {
                return Err(ChassisError::Registry(format!(
                    "rewrite {} references unknown endpoint {:?}",
                    rule.source, rule.endpoint
                )));
            }
        }
        Ok(Self {
            registry,
            rules,
            version,
            build_command: build_command.into(),
            output_directory: output_directory.into(),
        })
    }

    /// Resolve every rule for `env`, preserving declaration order.
    pub fn build(&self, env: EnvironmentKind) -> RoutingConfig {
        let rewrites = self
            .rules
            .iter()
            .filter_map(|rule| {
                let endpoint = self.registry.get(&rule.endpoint)?;
                Some(Rewrite {
                    source: rule.source.clone(),
                    destination: join_url(endpoint.url(env), &rule.path),
                })
            })
            .collect();

        RoutingConfig {
            version: self.version,
            build_command: self.build_command.clone(),
            output_directory: self.output_directory.clone(),
            rewrites,
        }
    }

    /// Pretty-printed JSON (2-space indent, trailing newline).
    pub fn render(&self, env: EnvironmentKind) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.build(env))?;
        json.push('\n');
        Ok(json)
    }

    /// Render for `env` and write to `output`.
    pub fn write(&self, output: &Path, env: EnvironmentKind) -> Result<RoutingReport> {
        info!(
            output = %output.display(),
            environment = %env,
            rewrites = self.rules.len(),
            "Generating routing config"
        );
        let json = self.render(env)?;
        write_output(output, &json, env, Vec::new())
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
