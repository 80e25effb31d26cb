// src/unit/mod.rs

//! Runnable units: single shell tasks and sequential task groups.
//!
//! - [`task`] holds [`Task`], one script plus an ordered recovery chain.
//! - [`group`] holds [`TaskGroup`], a fail-fast sequence of units.
//!
//! Both implement [`Runnable`], so groups nest and any unit can serve as a
//! recovery entry. Runs are synchronous; use [`spawn_run`] to drive a unit
//! from a background thread while other threads poll its state.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::errors::TaskError;
use crate::sync::lock;
use crate::types::Variables;

pub mod group;
pub mod task;

pub use group::{GroupObserver, TaskGroup};
pub use task::{Task, TaskBuilder, TaskObserver};

/// Anything that can be run as one logical step.
pub trait Runnable: Send + Sync + fmt::Debug {
    /// Display name used in logs and console output.
    fn name(&self) -> &str;

    /// True only between the start and the end of a run.
    fn is_running(&self) -> bool;

    /// Error recorded by the most recent run, `None` after a success.
    fn last_error(&self) -> Option<TaskError>;

    /// Run synchronously.
    ///
    /// Returns `Err(TaskError::AlreadyRunning)` without side effects when the
    /// unit is already running; otherwise the returned error is the one now
    /// reported by [`Runnable::last_error`].
    fn try_run(&self, variables: &Variables) -> Result<(), TaskError>;

    fn run(&self, variables: &Variables) -> bool {
        self.try_run(variables).is_ok()
    }
}

/// Run `unit` on a new thread.
pub fn spawn_run(unit: Arc<dyn Runnable>, variables: Variables) -> io::Result<JoinHandle<bool>> {
    thread::Builder::new()
        .name("taskchain-unit".to_string())
        .spawn(move || unit.run(&variables))
}

/// `running` / `last_error` bookkeeping shared by every unit.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    running: AtomicBool,
    last_error: Mutex<Option<TaskError>>,
}

impl RunState {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn last_error(&self) -> Option<TaskError> {
        lock(&self.last_error).clone()
    }

    /// Claim the unit for one run and clear the previous error.
    pub(crate) fn begin(&self, unit: &str) -> Result<RunGuard<'_>, TaskError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(unit, "run rejected: unit is already running");
            return Err(TaskError::AlreadyRunning {
                unit: unit.to_string(),
            });
        }

        *lock(&self.last_error) = None;
        Ok(RunGuard { state: self })
    }
}

/// Clears `running` when dropped, on every exit path.
pub(crate) struct RunGuard<'a> {
    state: &'a RunState,
}

impl RunGuard<'_> {
    /// Record the outcome, then release the unit.
    pub(crate) fn finish(self, result: Result<(), TaskError>) -> Result<(), TaskError> {
        *lock(&self.state.last_error) = result.as_ref().err().cloned();
        result
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}
