//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which runs `openstack` and
//! `knife` with `std::process::Command`, either streaming their output to the
//! log or collecting it for JSON parsing.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use which::which;

use super::pipe::{StreamType, panic_message, read_pipe_to_log};
use super::{CapturedOutput, CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::KnifebootError;

/// Cleans up a child process and its associated reader threads.
fn cleanup_child_process<I>(child: &mut Child, handles: I)
where
    I: IntoIterator<Item = JoinHandle<()>>,
{
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
    for handle in handles {
        if let Err(e) = handle.join() {
            tracing::warn!("reader thread panicked during cleanup: {}", panic_message(&*e));
        }
    }
}

fn resolve_command(spec: &CommandSpec) -> Result<PathBuf, KnifebootError> {
    let cmd = which(&spec.command).map_err(|_| KnifebootError::CommandNotFound {
        command: spec.command.clone(),
    })?;
    tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());
    Ok(cmd)
}

fn build_command(path: PathBuf, spec: &CommandSpec) -> Command {
    let mut command = Command::new(path);
    command.args(&spec.args);
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    command
}

fn execution_error(spec: &CommandSpec, status: String) -> anyhow::Error {
    KnifebootError::Execution {
        command: spec.display(),
        status,
    }
    .into()
}

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, [`execute`](CommandExecutor::execute) logs the
/// command and returns `Ok(ExecutionResult { status: None })`.
/// [`capture`](CommandExecutor::capture) always runs.
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {}", spec.display());
            return Ok(ExecutionResult { status: None });
        }

        let mut command = build_command(resolve_command(spec)?, spec);
        command.stdin(Stdio::inherit());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn command `{}`", spec.display()))?;

        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_tool = spec.command.clone();
        let stderr_tool = spec.command.clone();

        let stdout_handle = match thread::Builder::new()
            .name("stdout-reader".to_string())
            .spawn(move || read_pipe_to_log(&stdout_tool, stdout_pipe, StreamType::Stdout))
        {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, []);
                return Err(execution_error(
                    spec,
                    format!("failed to spawn stdout reader thread: {}", e),
                ));
            }
        };

        let stderr_handle = match thread::Builder::new()
            .name("stderr-reader".to_string())
            .spawn(move || read_pipe_to_log(&stderr_tool, stderr_pipe, StreamType::Stderr))
        {
            Ok(handle) => handle,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle]);
                return Err(execution_error(
                    spec,
                    format!("failed to spawn stderr reader thread: {}", e),
                ));
            }
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                cleanup_child_process(&mut child, [stdout_handle, stderr_handle]);
                return Err(execution_error(spec, format!("failed to wait for command: {}", e)));
            }
        };

        let mut panicked_streams = Vec::new();
        let handles = [("stdout", stdout_handle), ("stderr", stderr_handle)];
        for (name, handle) in handles {
            if let Err(e) = handle.join() {
                let msg = panic_message(&*e);
                tracing::error!(stream = name, panic = msg, "reader thread panicked");
                panicked_streams.push(format!("{}: {}", name, msg));
            }
        }

        if !panicked_streams.is_empty() {
            return Err(execution_error(
                spec,
                format!(
                    "reader thread(s) panicked during command execution: {}",
                    panicked_streams.join(", ")
                ),
            ));
        }

        tracing::trace!("executed command: {}: success={}", spec.command, status.success());

        Ok(ExecutionResult {
            status: Some(status),
        })
    }

    fn capture(&self, spec: &CommandSpec) -> Result<CapturedOutput> {
        let mut command = build_command(resolve_command(spec)?, spec);
        command.stdin(Stdio::null());

        tracing::debug!("running: {}", spec.display());
        let output = command
            .output()
            .with_context(|| format!("failed to run command `{}`", spec.display()))?;

        tracing::trace!(
            "captured command: {}: success={} stdout_bytes={}",
            spec.command,
            output.status.success(),
            output.stdout.len()
        );

        Ok(CapturedOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
