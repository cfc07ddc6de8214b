//! Service endpoint registry.
//!
//! Every endpoint binds one placeholder name to one URL per environment.
//! The registry rejects any set where two placeholders could produce the
//! same concrete URL. That bijectivity is what lets the template generator
//! turn a previously generated file back into its template.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::environment::EnvironmentKind;
use crate::error::{ChassisError, Result};

/// One backing service reachable through a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Rule-facing key (e.g. `assets`).
    pub key: String,

    /// Template placeholder name without braces (e.g. `ASSETS_URL`).
    /// Derived from the key when left empty.
    #[serde(default)]
    pub placeholder: String,

    pub production: String,

    pub staging: String,
}

impl ServiceEndpoint {
    /// Endpoint whose placeholder is `<KEY>_URL`.
    pub fn new(
        key: impl Into<String>,
        production: impl Into<String>,
        staging: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self {
            placeholder: derive_placeholder(&key),
            key,
            production: production.into(),
            staging: staging.into(),
        }
    }

    /// Fill in `<KEY>_URL` when no placeholder was configured.
    pub fn with_derived_placeholder(mut self) -> Self {
        if self.placeholder.trim().is_empty() {
            self.placeholder = derive_placeholder(&self.key);
        }
        self
    }

    pub fn url(&self, env: EnvironmentKind) -> &str {
        match env {
            EnvironmentKind::Production => &self.production,
            EnvironmentKind::Staging => &self.staging,
        }
    }

    /// The literal template token, `{{NAME}}`.
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.placeholder)
    }
}

/// Validated, immutable set of endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistry {
    endpoints: Vec<ServiceEndpoint>,
}

impl EndpointRegistry {
    pub fn new(endpoints: Vec<ServiceEndpoint>) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut placeholders = HashSet::new();
        let mut urls: Vec<&str> = Vec::new();

        for endpoint in &endpoints {
            if !is_placeholder_name(&endpoint.placeholder) {
                return Err(ChassisError::Registry(format!(
                    "placeholder {:?} must be an uppercase identifier",
                    endpoint.placeholder
                )));
            }
            if !keys.insert(endpoint.key.as_str()) {
                return Err(ChassisError::Registry(format!(
                    "duplicate endpoint key: {}",
                    endpoint.key
                )));
            }
            if !placeholders.insert(endpoint.placeholder.as_str()) {
                return Err(ChassisError::Registry(format!(
                    "duplicate placeholder: {}",
                    endpoint.placeholder
                )));
            }
            for env in EnvironmentKind::ALL {
                let url = endpoint.url(env);
                if url.trim().is_empty() || url.contains("{{") {
                    return Err(ChassisError::Registry(format!(
                        "endpoint {} has an invalid {env} URL: {url:?}",
                        endpoint.key
                    )));
                }
                if urls.contains(&url) {
                    return Err(ChassisError::Registry(format!(
                        "URL {url} is bound more than once; placeholders must map to distinct URLs"
                    )));
                }
                if let Some(other) = urls.iter().find(|o| shadows(o, url) || shadows(url, o)) {
                    return Err(ChassisError::Registry(format!(
                        "URLs {other} and {url} overlap; one is a path prefix of the other"
                    )));
                }
                urls.push(url);
            }
        }

        Ok(Self { endpoints })
    }

    /// The five Chassis services deployed on Vercel.
    pub fn chassis_defaults() -> Self {
        let endpoints = ["assets", "css", "tokens", "figma", "icons"]
            .into_iter()
            .map(|key| {
                ServiceEndpoint::new(
                    key,
                    format!("https://chassis-{key}.vercel.app"),
                    format!("https://chassis-{key}-staging.vercel.app"),
                )
            })
            .collect();
        Self { endpoints }
    }

    pub fn get(&self, key: &str) -> Option<&ServiceEndpoint> {
        self.endpoints.iter().find(|e| e.key == key)
    }

    pub fn by_placeholder(&self, name: &str) -> Option<&ServiceEndpoint> {
        self.endpoints.iter().find(|e| e.placeholder == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceEndpoint> {
        self.endpoints.iter()
    }

    pub fn endpoints(&self) -> &[ServiceEndpoint] {
        &self.endpoints
    }
}

fn derive_placeholder(key: &str) -> String {
    format!("{}_URL", key.to_ascii_uppercase().replace('-', "_"))
}

/// True when `short` would match at the start of `long` on a URL boundary,
/// so text rendered from one could be read back as the other.
fn shadows(short: &str, long: &str) -> bool {
    long.len() > short.len()
        && long.starts_with(short)
        && !long[short.len()..].chars().next().is_some_and(is_url_continuation)
}

/// Characters that extend a URL rather than end it.
pub(crate) fn is_url_continuation(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '~' | ':' | '-')
}

/// `[A-Z][A-Z0-9_]*`
pub(crate) fn is_placeholder_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
