// src/errors.rs

//! Crate-wide error types.
//!
//! - [`TaskError`] is what a runnable unit records as its last error. It is
//!   `Clone` so a group can hand its failing child's error up verbatim.
//! - [`TaskchainError`] covers configuration loading and plan building.

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The shell itself could not be started.
    #[error("failed to spawn shell '{shell}': {message}")]
    Spawn {
        shell: String,
        kind: io::ErrorKind,
        message: String,
    },

    /// The process ran to completion with a non-zero exit status.
    #[error("command exited with status {status}: {command}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("command timed out after {after:?}: {command}")]
    TimedOut { command: String, after: Duration },

    #[error("command cancelled: {command}")]
    Cancelled { command: String },

    /// `run` was called on a unit that is already running.
    #[error("'{unit}' is already running")]
    AlreadyRunning { unit: String },

    /// Pipe or wait failure after the process was spawned.
    #[error("{context}: {message}")]
    Io { context: String, message: String },
}

impl TaskError {
    pub fn spawn(shell: impl Into<String>, err: &io::Error) -> Self {
        TaskError::Spawn {
            shell: shell.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn io(context: impl Into<String>, err: &io::Error) -> Self {
        TaskError::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Exit status carried by the error, if the process got that far.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            TaskError::CommandFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Cancellation halts recovery chains and groups instead of being
    /// treated as an ordinary failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TaskError::Cancelled { .. })
    }
}

#[derive(Error, Debug)]
pub enum TaskchainError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Reference cycle detected: {0}")]
    ReferenceCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskchainError>;
