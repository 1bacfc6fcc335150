//! Domain-specific error types for knifeboot.
//!
//! This module defines `KnifebootError`, a `thiserror`-based enum with one
//! variant per failure mode of the bootstrap workflow. Public API functions
//! return `Result<T, KnifebootError>` so callers can match on the kind of
//! failure, while trait boundaries (executors, catalogs) use `anyhow::Result`.
//!
//! `KnifebootError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at those boundaries.

use std::io;

use crate::catalog::ResourceKind;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)").
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for knifeboot.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KnifebootError {
    /// A required environment variable is unset or empty.
    #[error("environment variable {name} is not set (hint: {hint})")]
    MissingEnvironment {
        /// Name of the variable.
        name: &'static str,
        /// Corrective hint shown to the operator.
        hint: String,
    },

    /// The knife configuration file could not be read.
    #[error("could not read knife config {path}: {}", io_error_kind_message(source))]
    ConfigNotFound {
        /// Path that was read.
        path: String,
        #[source]
        source: io::Error,
    },

    /// The knife configuration lacks one or more required settings.
    #[error("knife config is missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    /// Authentication against the cloud provider failed.
    #[error("authentication failed: {0}")]
    AuthenticationError(String),

    /// Listing a resource from an external collaborator failed.
    #[error("failed to list {resource}: {message}")]
    ResourceListError {
        /// Human-readable resource name (e.g., "images").
        resource: String,
        /// What went wrong.
        message: String,
    },

    /// The operator entered something that is not a listed index.
    #[error("invalid selection {input:?}: expected a number between 1 and {count}")]
    InvalidSelection {
        /// The trimmed input line.
        input: String,
        /// Number of candidates that were offered.
        count: usize,
    },

    /// There was nothing to choose from.
    #[error("no {0} available to choose from")]
    NoCandidates(ResourceKind),

    /// A validation constraint was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// The settings file could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required command was not found in PATH.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command that was looked up.
        command: String,
    },

    /// A command execution failed (non-zero exit, spawn failure, wait failure, etc.).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Exit code, signal information or an internal failure description.
        status: String,
    },

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred.
        context: String,
        /// Derived from [`io_error_kind_message`].
        message: String,
        #[source]
        source: io::Error,
    },
}

impl KnifebootError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates a `ResourceListError` for the given resource.
    pub(crate) fn listing(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ResourceListError {
            resource: resource.into(),
            message: message.into(),
        }
    }
}
