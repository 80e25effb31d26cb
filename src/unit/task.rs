// src/unit/task.rs

//! A single shell script with an ordered recovery chain.
//!
//! When the script fails, the recovery units run in declared order until one
//! succeeds. The first success makes the whole task succeed; if every
//! recovery fails, the task reports the error of the last one attempted.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, info};

use crate::errors::TaskError;
use crate::sync::lock;
use crate::exec::{CommandExecutor, Invocation, ShellRunner};
use crate::types::{ExecutionResult, OutputChunk, Variables};

use super::{RunState, Runnable};

/// Lifecycle callbacks for a [`Task`]. Every method is optional.
///
/// Tasks only keep a weak reference to their observer.
pub trait TaskObserver: Send + Sync {
    fn task_will_start(&self, _task: &Task) {}

    /// Output as it is produced; chunks are not aligned to lines.
    fn task_did_produce_output(&self, _task: &Task, _chunk: &OutputChunk) {}

    /// The task's own script finished. `status` is `-1` when the process
    /// never produced one (spawn failure, timeout, cancellation).
    fn task_did_end(&self, _task: &Task, _status: i32) {}
}

pub struct Task {
    name: String,
    script: String,
    input: Option<String>,
    timeout: Option<Duration>,
    recovery: Vec<Arc<dyn Runnable>>,
    executor: Arc<dyn CommandExecutor>,
    state: RunState,
    last_result: Mutex<Option<ExecutionResult>>,
    observer: Mutex<Option<Weak<dyn TaskObserver>>>,
}

impl Task {
    /// A task without recovery, run through the user's login shell.
    pub fn new(script: impl Into<String>) -> Self {
        Self::builder(script).build()
    }

    pub fn builder(script: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(script)
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn recovery_units(&self) -> &[Arc<dyn Runnable>] {
        &self.recovery
    }

    /// Result of this task's own script during the most recent run.
    ///
    /// `None` before the first run or when the script could not complete.
    pub fn last_result(&self) -> Option<ExecutionResult> {
        lock(&self.last_result).clone()
    }

    pub fn set_observer<O: TaskObserver + 'static>(&self, observer: &Arc<O>) {
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn TaskObserver> = weak;
        *lock(&self.observer) = Some(weak);
    }

    pub fn clear_observer(&self) {
        *lock(&self.observer) = None;
    }

    fn notify(&self, f: impl FnOnce(&dyn TaskObserver)) {
        let observer = lock(&self.observer).as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            f(observer.as_ref());
        }
    }

    fn invocation(&self, variables: &Variables) -> Invocation {
        Invocation {
            command: self.script.clone(),
            input: self.input.clone(),
            variables: variables.clone(),
            timeout: self.timeout,
        }
    }

    /// Run the script itself, without recovery.
    fn run_script(&self, invocation: &Invocation) -> Result<(), TaskError> {
        let mut forward =
            |chunk: &OutputChunk| self.notify(|o| o.task_did_produce_output(self, chunk));
        let outcome = self.executor.execute(invocation, &mut forward);

        *lock(&self.last_result) = outcome.as_ref().ok().cloned();
        let status = outcome.as_ref().map_or(-1, |r| r.exit_status);
        self.notify(|o| o.task_did_end(self, status));

        let result = outcome?;
        if result.success() {
            return Ok(());
        }

        Err(TaskError::CommandFailed {
            command: invocation.resolved_command().into_owned(),
            status: result.exit_status,
            stderr: result.stderr,
        })
    }

    fn recover(&self, failure: TaskError, variables: &Variables) -> Result<(), TaskError> {
        info!(
            task = %self.name,
            error = %failure,
            candidates = self.recovery.len(),
            "task failed; trying recovery"
        );

        let mut last = failure;
        for (index, unit) in self.recovery.iter().enumerate() {
            debug!(task = %self.name, recovery = %unit.name(), index, "running recovery unit");

            match unit.try_run(variables) {
                Ok(()) => {
                    info!(task = %self.name, recovery = %unit.name(), "task recovered");
                    return Ok(());
                }
                Err(err) if err.is_cancellation() => return Err(err),
                Err(err) => {
                    debug!(
                        task = %self.name,
                        recovery = %unit.name(),
                        error = %err,
                        "recovery unit failed"
                    );
                    last = err;
                }
            }
        }

        Err(last)
    }
}

impl Runnable for Task {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn last_error(&self) -> Option<TaskError> {
        self.state.last_error()
    }

    fn try_run(&self, variables: &Variables) -> Result<(), TaskError> {
        let guard = self.state.begin(&self.name)?;
        *lock(&self.last_result) = None;

        info!(task = %self.name, "task started");
        self.notify(|o| o.task_will_start(self));

        let invocation = self.invocation(variables);
        let result = match self.run_script(&invocation) {
            Err(err) if !err.is_cancellation() && !self.recovery.is_empty() => {
                self.recover(err, variables)
            }
            other => other,
        };

        match &result {
            Ok(()) => info!(task = %self.name, "task succeeded"),
            Err(err) => info!(task = %self.name, error = %err, "task failed"),
        }
        guard.finish(result)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("script", &self.script)
            .field("recovery", &self.recovery)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Task`].
pub struct TaskBuilder {
    name: Option<String>,
    script: String,
    input: Option<String>,
    timeout: Option<Duration>,
    recovery: Vec<Arc<dyn Runnable>>,
    executor: Option<Arc<dyn CommandExecutor>>,
}

impl TaskBuilder {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            name: None,
            script: script.into(),
            input: None,
            timeout: None,
            recovery: Vec::new(),
            executor: None,
        }
    }

    /// Display name; defaults to the script text.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Text written to the script's standard input.
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a recovery unit, tried after the ones already added.
    pub fn recover<U: Runnable + 'static>(mut self, unit: U) -> Self {
        self.recovery.push(Arc::new(unit));
        self
    }

    /// Append a recovery unit that is shared with other owners.
    pub fn recover_shared(mut self, unit: Arc<dyn Runnable>) -> Self {
        self.recovery.push(unit);
        self
    }

    /// Executor used to run the script; defaults to a [`ShellRunner`] on the
    /// user's login shell.
    pub fn executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Task {
        Task {
            name: self.name.unwrap_or_else(|| self.script.clone()),
            script: self.script,
            input: self.input,
            timeout: self.timeout,
            recovery: self.recovery,
            executor: self
                .executor
                .unwrap_or_else(|| Arc::new(ShellRunner::default())),
            state: RunState::default(),
            last_result: Mutex::new(None),
            observer: Mutex::new(None),
        }
    }
}
