use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use taskchain::errors::TaskError;
use taskchain::exec::{ChunkSink, CommandExecutor, Invocation};
use taskchain::types::{ExecutionResult, OutputChunk};

/// Canned outcome for one command.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: i32,
    chunks: Vec<OutputChunk>,
    error: Option<TaskError>,
}

impl Response {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn status(status: i32) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// The command never produces a status; `execute` returns `error`.
    pub fn error(error: TaskError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn stdout(mut self, text: &str) -> Self {
        self.chunks.push(OutputChunk::stdout(text));
        self
    }

    pub fn stderr(mut self, text: &str) -> Self {
        self.chunks.push(OutputChunk::stderr(text));
        self
    }
}

/// Blocks a command until the test opens it.
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    entered: bool,
    open: bool,
}

impl Gate {
    /// Wait until a command reached the gate.
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        let state = lock(&self.state);
        let (state, _) = self
            .cond
            .wait_timeout_while(state, timeout, |s| !s.entered)
            .unwrap_or_else(|e| e.into_inner());
        state.entered
    }

    pub fn open(&self) {
        lock(&self.state).open = true;
        self.cond.notify_all();
    }

    fn pass(&self) {
        let mut state = lock(&self.state);
        state.entered = true;
        self.cond.notify_all();
        let _state = self
            .cond
            .wait_while(state, |s| !s.open)
            .unwrap_or_else(|e| e.into_inner());
    }
}

/// A fake executor that:
/// - records the resolved command of every invocation
/// - replays a canned [`Response`] per command (unknown commands succeed
///   without output)
/// - optionally holds a command at a [`Gate`].
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, Response>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, command: &str, response: Response) -> Self {
        lock(&self.responses).insert(command.to_string(), response);
        self
    }

    pub fn gate(&self, command: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        lock(&self.gates).insert(command.to_string(), Arc::clone(&gate));
        gate
    }

    /// Resolved commands in the order they were executed.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    pub fn count(&self, command: &str) -> usize {
        lock(&self.executed)
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(
        &self,
        invocation: &Invocation,
        on_chunk: &mut ChunkSink<'_>,
    ) -> Result<ExecutionResult, TaskError> {
        let command = invocation.resolved_command().into_owned();
        lock(&self.executed).push(command.clone());

        let gate = lock(&self.gates).get(&command).cloned();
        if let Some(gate) = gate {
            gate.pass();
        }

        let response = lock(&self.responses)
            .get(&command)
            .cloned()
            .unwrap_or_default();
        if let Some(error) = response.error {
            return Err(error);
        }

        let mut result = ExecutionResult {
            exit_status: response.status,
            ..ExecutionResult::default()
        };
        for chunk in response.chunks.iter() {
            on_chunk(chunk);
            result.push_chunk(chunk);
        }
        Ok(result)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
