//! Command execution abstraction for knifeboot.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of a streamed command execution
//! - [`CapturedOutput`]: Result of a command whose stdout is collected
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`

mod pipe;
mod real;

use std::process::ExitStatus;

use anyhow::Result;

pub use real::RealCommandExecutor;

/// Quotes a single argument for display if it contains shell-significant characters.
pub(crate) fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Formats a command and its arguments as a single shell-style line.
///
/// Used by dry-run output and by the printed provisioning command
/// (e.g., `knife openstack server create -r 'role[common]'`).
pub fn format_command_line(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .map(shell_quote)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Specification for a command to be executed
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "knife")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set (in addition to inherited environment)
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
        }
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Adds multiple environment variables.
    #[must_use]
    pub fn with_envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Returns the command line for log and error messages.
    ///
    /// Environment values are never included since they may carry credentials.
    pub fn display(&self) -> String {
        format_command_line(&self.command, &self.args)
    }
}

/// Result of command execution
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Output of a command run with [`CommandExecutor::capture`].
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    /// Whether the command exited successfully.
    pub success: bool,
    /// Exit code if the process exited normally.
    pub code: Option<i32>,
    /// Collected stdout, lossily decoded.
    pub stdout: String,
    /// Collected stderr, lossily decoded.
    pub stderr: String,
}

/// Trait for command execution.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command, streaming its output to the log.
    ///
    /// Dry-run implementations skip execution and return a result without status.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;

    /// Runs a read-only command and collects its output.
    ///
    /// Used for resource listings, so it runs even in dry-run mode.
    fn capture(&self, spec: &CommandSpec) -> Result<CapturedOutput>;
}
