//! Routing (rewrite) configuration generation.
//!
//! Provides:
//! - [`endpoint::EndpointRegistry`]: placeholder ↔ URL bindings per environment
//! - [`template::TemplateGenerator`]: idempotent `{{NAME}}` template regeneration
//! - [`structured::StructuredGenerator`]: rule-registry based `vercel.json` builder

pub mod endpoint;
pub mod structured;
pub mod template;

pub use endpoint::{EndpointRegistry, ServiceEndpoint};
pub use structured::{chassis_default_rules, Rewrite, RoutingConfig, RoutingRule, StructuredGenerator};
pub use template::{Rendered, TemplateGenerator};

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::environment::EnvironmentKind;
use crate::error::Result;

/// Outcome of one routing generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingReport {
    pub environment: EnvironmentKind,
    pub output: PathBuf,
    /// SHA-256 of the written content (hex).
    pub digest: String,
    /// False when the file already had exactly this content.
    pub changed: bool,
    /// Placeholders left untouched because no endpoint owns them.
    pub unmanaged: Vec<String>,
}

/// Atomically replace `output` with `content` unless it is already identical.
pub(crate) fn write_output(
    output: &Path,
    content: &str,
    environment: EnvironmentKind,
    unmanaged: Vec<String>,
) -> Result<RoutingReport> {
    let digest = hex::encode(Sha256::digest(content.as_bytes()));
    let changed = std::fs::read_to_string(output).map_or(true, |current| current != content);

    if changed {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        // Temp files are created owner-only; the committed config is not.
        match std::fs::metadata(output) {
            Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
            Err(_) => set_default_permissions(tmp.as_file())?,
        }
        tmp.persist(output).map_err(|e| e.error)?;
        info!(output = %output.display(), digest = %&digest[..12], "Routing config written");
    } else {
        info!(output = %output.display(), "Routing config already up to date");
    }

    Ok(RoutingReport {
        environment,
        output: output.to_path_buf(),
        digest,
        changed,
        unmanaged,
    })
}

#[cfg(unix)]
fn set_default_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}
