// src/unit/group.rs

//! Fail-fast sequential composition of runnable units.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, info};

use crate::errors::TaskError;
use crate::sync::lock;
use crate::types::Variables;

use super::{RunState, Runnable};

/// Lifecycle callbacks for a [`TaskGroup`]. Every method is optional.
///
/// Groups only keep a weak reference to their observer.
pub trait GroupObserver: Send + Sync {
    fn group_will_start(&self, _group: &TaskGroup) {}
    fn unit_will_run(&self, _group: &TaskGroup, _index: usize, _unit: &dyn Runnable) {}
    fn group_did_end(&self, _group: &TaskGroup, _success: bool) {}
}

/// Runs its units one after another and stops at the first failure.
///
/// An empty group succeeds trivially.
pub struct TaskGroup {
    name: String,
    units: Vec<Arc<dyn Runnable>>,
    state: RunState,
    // Index into `units`; only set while that unit is executing.
    current: Mutex<Option<usize>>,
    observer: Mutex<Option<Weak<dyn GroupObserver>>>,
}

impl TaskGroup {
    pub fn new(name: impl Into<String>, units: Vec<Arc<dyn Runnable>>) -> Self {
        Self {
            name: name.into(),
            units,
            state: RunState::default(),
            current: Mutex::new(None),
            observer: Mutex::new(None),
        }
    }

    pub fn with_unit<U: Runnable + 'static>(mut self, unit: U) -> Self {
        self.units.push(Arc::new(unit));
        self
    }

    pub fn with_shared_unit(mut self, unit: Arc<dyn Runnable>) -> Self {
        self.units.push(unit);
        self
    }

    pub fn units(&self) -> &[Arc<dyn Runnable>] {
        &self.units
    }

    /// The unit executing right now, if any.
    pub fn current_unit(&self) -> Option<Arc<dyn Runnable>> {
        self.current_index()
            .and_then(|index| self.units.get(index).cloned())
    }

    pub fn current_index(&self) -> Option<usize> {
        *lock(&self.current)
    }

    pub fn set_observer<O: GroupObserver + 'static>(&self, observer: &Arc<O>) {
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn GroupObserver> = weak;
        *lock(&self.observer) = Some(weak);
    }

    pub fn clear_observer(&self) {
        *lock(&self.observer) = None;
    }

    fn notify(&self, f: impl FnOnce(&dyn GroupObserver)) {
        let observer = lock(&self.observer).as_ref().and_then(Weak::upgrade);
        if let Some(observer) = observer {
            f(observer.as_ref());
        }
    }

    fn set_current(&self, index: Option<usize>) {
        *lock(&self.current) = index;
    }

    fn run_units(&self, variables: &Variables) -> Result<(), TaskError> {
        for (index, unit) in self.units.iter().enumerate() {
            self.set_current(Some(index));
            self.notify(|o| o.unit_will_run(self, index, unit.as_ref()));
            debug!(group = %self.name, unit = %unit.name(), index, "running unit");

            let outcome = unit.try_run(variables);
            self.set_current(None);

            if let Err(err) = outcome {
                info!(
                    group = %self.name,
                    unit = %unit.name(),
                    error = %err,
                    skipped = self.units.len() - index - 1,
                    "unit failed; stopping group"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Runnable for TaskGroup {
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
        self.set_current(None);

        info!(group = %self.name, units = self.units.len(), "group started");
        self.notify(|o| o.group_will_start(self));

        let result = self.run_units(variables);
        self.set_current(None);

        info!(group = %self.name, success = result.is_ok(), "group finished");
        self.notify(|o| o.group_did_end(self, result.is_ok()));
        guard.finish(result)
    }
}

impl fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("name", &self.name)
            .field("units", &self.units)
            .field("running", &self.is_running())
            .field("current", &self.current_index())
            .finish_non_exhaustive()
    }
}
