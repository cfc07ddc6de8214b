//! Git invocations used by the orchestrator.
//!
//! Commands that mutate the workspace are returned as [`CommandSpec`]s and
//! run through a [`crate::CommandRunner`], so they can be scripted in tests.
//! Read-only queries needed before any runner exists (the current branch for
//! the pre-commit helper) run `git` directly.

use std::path::Path;
use std::process::Command;

use crate::command::CommandSpec;
use crate::error::{ChassisError, Result};

/// `git submodule status`: registry-wide "are submodules initialized" probe.
pub fn submodule_status() -> CommandSpec {
    CommandSpec::new("git", ["submodule", "status"]).quiet()
}

/// `git submodule update --init --recursive`
pub fn submodule_init_recursive() -> CommandSpec {
    CommandSpec::new("git", ["submodule", "update", "--init", "--recursive"])
}

/// `git submodule update --remote --merge <path>`: fetch and merge, keeping
/// local work (the command fails instead of discarding it).
pub fn submodule_update_merge(path: &str) -> CommandSpec {
    CommandSpec::new("git", ["submodule", "update", "--remote", "--merge", path]).quiet()
}

/// `git submodule update --init --remote <path>`
pub fn submodule_update_init_remote(path: &str) -> CommandSpec {
    CommandSpec::new("git", ["submodule", "update", "--init", "--remote", path])
}

/// `git -C <path> checkout <branch>`
pub fn checkout(path: &str, branch: &str) -> CommandSpec {
    CommandSpec::new("git", ["-C", path, "checkout", branch]).quiet()
}

/// `git -C <path> pull <remote> <branch>`
pub fn pull(path: &str, remote: &str, branch: &str) -> CommandSpec {
    CommandSpec::new("git", ["-C", path, "pull", remote, branch]).quiet()
}

/// `git status --porcelain`
pub fn status_porcelain() -> CommandSpec {
    CommandSpec::new("git", ["status", "--porcelain"]).quiet()
}

/// Name of the checked-out branch in `repo_dir`.
///
/// Returns `Ok(None)` on a detached HEAD, and an error when the directory is
/// not a git repository or git is not available.
pub fn current_branch(repo_dir: &Path) -> Result<Option<String>> {
    let output = Command::new("git")
        .args(["branch", "--show-current"])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| ChassisError::GitError(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ChassisError::GitError(format!(
            "git branch --show-current failed: {}",
            stderr.trim()
        )));
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!branch.is_empty()).then_some(branch))
}

/// True when `dir` is inside a checked-out work tree.
///
/// `git rev-parse` also succeeds inside `.git` itself, where it prints
/// `false`, so the answer is read from stdout.
pub fn is_git_repo(dir: &Path) -> bool {
    match Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
    {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim() == "true"
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    #[test]
    fn submodule_update_merge_never_forces() {
        let spec = submodule_update_merge("vendor/tokens");
        assert_eq!(
            spec.to_string(),
            "git submodule update --remote --merge vendor/tokens"
        );
        assert!(!spec.args.iter().any(|a| a == "--force"));
        assert!(spec.quiet);
    }

    #[test]
    fn checkout_and_pull_target_submodule_dir() {
        assert_eq!(
            checkout("vendor/assets", "app/docs").to_string(),
            "git -C vendor/assets checkout app/docs"
        );
        assert_eq!(
            pull("vendor/assets", "origin", "app/docs").to_string(),
            "git -C vendor/assets pull origin app/docs"
        );
    }

    #[test]
    fn current_branch_reads_checked_out_branch() {
        let repo = make_git_repo();
        run_git(repo.path(), &["checkout", "-b", "staging"]);
        let branch = current_branch(repo.path()).unwrap();
        assert_eq!(branch.as_deref(), Some("staging"));
    }

    #[test]
    fn current_branch_is_none_when_detached() {
        let repo = make_git_repo();
        run_git(repo.path(), &["checkout", "--detach"]);
        assert_eq!(current_branch(repo.path()).unwrap(), None);
    }

    #[test]
    fn current_branch_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(current_branch(dir.path()).is_err());
    }

    #[test]
    fn work_tree_detection_covers_nested_dirs_only() {
        let repo = make_git_repo();
        std::fs::create_dir_all(repo.path().join("site/src")).unwrap();
        assert!(is_git_repo(repo.path()));
        assert!(is_git_repo(&repo.path().join("site/src")));
        assert!(!is_git_repo(&repo.path().join(".git")));

        let plain = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(plain.path()));
    }
}
