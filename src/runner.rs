use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::registry::JobStatus;

/// Shell-execution primitive: run one command string synchronously and
/// return its exit code with combined stdout/stderr.
///
/// The registry and runner only ever talk to the host through this trait,
/// so tests can substitute a double that counts or scripts invocations.
pub trait Shell {
    fn execute(&self, command: &str) -> Result<(Option<i32>, String)>;
}

/// Runs commands through the host `sh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn execute(&self, command: &str) -> Result<(Option<i32>, String)> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| RegistryError::Environment {
                command: command.to_string(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        // status.code() is None when the process died to a signal
        Ok((output.status.code(), combined))
    }
}

/// One logical job: a single command or an ordered sequence submitted
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Single(String),
    Sequence(Vec<String>),
}

impl CommandLine {
    /// Shell form of the command line. Sequences are chained with `;` so
    /// later commands run regardless of earlier failures.
    pub fn to_shell(&self) -> String {
        match self {
            CommandLine::Single(command) => command.clone(),
            CommandLine::Sequence(commands) => commands.join("; "),
        }
    }

    /// The individual commands, in submission order.
    pub fn commands(&self) -> Vec<&str> {
        match self {
            CommandLine::Single(command) => vec![command.as_str()],
            CommandLine::Sequence(commands) => commands.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Single(command) => command.trim().is_empty(),
            CommandLine::Sequence(commands) => {
                commands.is_empty() || commands.iter().all(|c| c.trim().is_empty())
            }
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_shell())
    }
}

impl From<&str> for CommandLine {
    fn from(command: &str) -> Self {
        CommandLine::Single(command.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(command: String) -> Self {
        CommandLine::Single(command)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(commands: Vec<String>) -> Self {
        CommandLine::Sequence(commands)
    }
}

impl From<&[&str]> for CommandLine {
    fn from(commands: &[&str]) -> Self {
        CommandLine::Sequence(commands.iter().map(|c| c.to_string()).collect())
    }
}

/// Result of one launch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub output: String,
}

/// Executes command lines, or simulates them in dry-run mode.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner<S = SystemShell> {
    shell: S,
}

impl CommandRunner<SystemShell> {
    pub fn new() -> Self {
        Self { shell: SystemShell }
    }
}

impl<S: Shell> CommandRunner<S> {
    pub fn with_shell(shell: S) -> Self {
        Self { shell }
    }

    /// Run a command line synchronously and map its exit status to an
    /// [`Outcome`].
    ///
    /// A non-zero exit code is captured as `status: failed` in the
    /// outcome rather than escalated; only an empty command line or a
    /// missing execution environment is an error. No timeout is applied:
    /// a hung command blocks the caller indefinitely.
    pub fn run(&self, command: &CommandLine, dry_run: bool) -> Result<Outcome> {
        if command.is_empty() {
            return Err(RegistryError::InvalidArgument {
                operation: "run",
                reason: "empty command line".to_string(),
            });
        }

        let shell_form = command.to_shell();

        if dry_run {
            tracing::info!(command = %shell_form, "dry-run, skipping execution");
            return Ok(Outcome {
                status: JobStatus::SkippedDryRun,
                exit_code: None,
                output: format!("dry-run: would execute `{shell_form}`"),
            });
        }

        tracing::info!(command = %shell_form, "executing command");
        let (exit_code, output) = self.shell.execute(&shell_form)?;

        let status = if exit_code == Some(0) {
            JobStatus::Executed
        } else {
            tracing::warn!(command = %shell_form, exit_code = ?exit_code, "command failed");
            JobStatus::Failed
        };

        Ok(Outcome {
            status,
            exit_code,
            output,
        })
    }
}
