//! Workspace inspection and filesystem helpers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Presence of one expected directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryCheck {
    pub name: String,
    pub path: PathBuf,
    pub present: bool,
}

/// Advisory check that expected local directories exist.
///
/// Never fails and never touches the filesystem beyond `exists()`. It only
/// surfaces actionable warnings before a potentially long build.
pub struct WorkspaceInspector;

impl WorkspaceInspector {
    /// Check each `(path, human name)` pair, in order.
    pub fn inspect(expected: &[(PathBuf, String)]) -> Vec<DirectoryCheck> {
        info!("Checking project dependencies");
        expected
            .iter()
            .map(|(path, name)| {
                let present = path.exists();
                if present {
                    info!(name = %name, path = %path.display(), "Found");
                } else {
                    warn!(name = %name, path = %path.display(), "Missing directory");
                }
                DirectoryCheck {
                    name: name.clone(),
                    path: path.clone(),
                    present,
                }
            })
            .collect()
    }
}

/// Remove `path` recursively if it exists. Returns whether anything was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(path)?;
            Ok(true)
        }
        Ok(_) => {
            fs::remove_file(path)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Replace `dst` with a copy of `src`: remove first, then copy.
///
/// Files that only existed in the old `dst` never survive.
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    remove_if_exists(dst)?;
    copy_dir(src, dst)
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Sorted entry names of a directory.
pub fn list_entries(dir: &Path) -> Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<std::io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}
