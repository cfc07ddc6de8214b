//! In-memory fakes for the command runner (testing only)
//!
//! [`ScriptedRunner`] satisfies the [`CommandRunner`] contract without
//! spawning processes: it records every invocation and answers from a list
//! of scripted rules, succeeding by default.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::{ChassisError, Result};

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    SpawnError(String),
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    cwd: Option<PathBuf>,
    response: Response,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        if !spec.to_string().starts_with(&self.prefix) {
            return false;
        }
        match &self.cwd {
            Some(dir) => spec.cwd.as_deref() == Some(dir.as_path()),
            None => true,
        }
    }
}

/// Command runner that replays scripted results.
///
/// Rules match on a prefix of the rendered command line (`git submodule
/// status`), optionally restricted to a working directory. The first matching
/// rule wins. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands starting with `prefix` exit with `exit_code` and `stderr`.
    pub fn fail_on(self, prefix: &str, exit_code: i32, stderr: &str) -> Self {
        self.push(prefix, None, Response::Output(CommandOutput::failed(exit_code, stderr)))
    }

    /// Like [`fail_on`](Self::fail_on), but only when run inside `dir`.
    pub fn fail_on_in(self, dir: &Path, prefix: &str, exit_code: i32, stderr: &str) -> Self {
        self.push(
            prefix,
            Some(dir.to_path_buf()),
            Response::Output(CommandOutput::failed(exit_code, stderr)),
        )
    }

    /// Commands starting with `prefix` succeed and print `stdout`.
    pub fn succeed_on(self, prefix: &str, stdout: &str) -> Self {
        self.push(prefix, None, Response::Output(CommandOutput::ok(stdout)))
    }

    /// Commands starting with `prefix` fail to spawn.
    pub fn spawn_error_on(self, prefix: &str) -> Self {
        self.push(prefix, None, Response::SpawnError(prefix.to_string()))
    }

    fn push(mut self, prefix: &str, cwd: Option<PathBuf>, response: Response) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            cwd,
            response,
        });
        self
    }

    /// Every invocation so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered command lines of every invocation so far.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Number of invocations whose command line starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        match self.rules.iter().find(|rule| rule.matches(spec)) {
            Some(Rule {
                response: Response::Output(output),
                ..
            }) => Ok(output.clone()),
            Some(Rule {
                response: Response::SpawnError(detail),
                ..
            }) => Err(ChassisError::Spawn {
                program: spec.program.clone(),
                detail: format!("scripted spawn failure for `{detail}`"),
            }),
            None => Ok(CommandOutput::ok("")),
        }
    }
}
