// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! Tasks talk to a `CommandExecutor` instead of spawning processes directly.
//! Production code uses [`ShellRunner`](super::ShellRunner); tests can
//! provide an implementation that replays canned results without touching
//! the OS.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::errors::TaskError;
use crate::exec::variables::substitute;
use crate::types::{ExecutionResult, OutputChunk, Variables};

/// Everything needed to run one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    /// Written to the child's stdin, which is then closed.
    pub input: Option<String>,
    pub variables: Variables,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The command string after placeholder substitution.
    pub fn resolved_command(&self) -> Cow<'_, str> {
        substitute(&self.command, &self.variables)
    }
}

/// Callback receiving output chunks as they are read.
pub type ChunkSink<'a> = dyn FnMut(&OutputChunk) + Send + 'a;

/// Trait abstracting how a command is executed.
///
/// `execute` blocks until the command has finished. Implementations must
/// call `on_chunk` sequentially, never from two threads at once, and the
/// returned `ExecutionResult` must contain the concatenation of every chunk
/// delivered for each stream.
pub trait CommandExecutor: Send + Sync + fmt::Debug {
    fn execute(
        &self,
        invocation: &Invocation,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<ExecutionResult, TaskError>;
}
