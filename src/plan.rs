// src/plan.rs

//! Builds the tree of runnable units described by a validated config.
//!
//! A unit referenced from several places (two groups, or a group and a
//! recovery chain) is built once and shared.

use std::collections::BTreeMap;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::ConfigFile;
use crate::errors::{Result, TaskchainError};
use crate::exec::CommandExecutor;
use crate::types::Variables;
use crate::unit::{GroupObserver, Runnable, Task, TaskGroup, TaskObserver};

#[derive(Debug)]
pub struct Plan {
    units: BTreeMap<String, Arc<dyn Runnable>>,
    tasks: BTreeMap<String, Arc<Task>>,
    groups: BTreeMap<String, Arc<TaskGroup>>,
    default_unit: Option<String>,
    variables: Variables,
}

impl Plan {
    /// Build every task and group of `cfg`, running scripts with `executor`.
    pub fn from_config(cfg: &ConfigFile, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let default_timeout = cfg
            .settings()
            .default_timeout()
            .map_err(TaskchainError::ConfigError)?;

        let mut plan = Plan {
            units: BTreeMap::new(),
            tasks: BTreeMap::new(),
            groups: BTreeMap::new(),
            default_unit: cfg.default_unit().map(str::to_string),
            variables: cfg.vars().clone(),
        };

        // Referenced units first, so every reference already exists.
        for name in build_order(cfg)? {
            let refs = plan.resolve_all(cfg.references_of(name))?;

            if let Some(task_cfg) = cfg.tasks().get(name) {
                let timeout = task_cfg
                    .effective_timeout(default_timeout)
                    .map_err(|e| TaskchainError::ConfigError(format!("task '{name}': {e}")))?;

                let mut builder = Task::builder(task_cfg.script.clone())
                    .name(name)
                    .executor(Arc::clone(&executor));
                if let Some(ref input) = task_cfg.input {
                    builder = builder.input(input.clone());
                }
                if let Some(timeout) = timeout {
                    builder = builder.timeout(timeout);
                }
                for unit in refs {
                    builder = builder.recover_shared(unit);
                }

                let task = Arc::new(builder.build());
                debug!(task = %name, "built task");
                plan.units.insert(name.to_string(), task.clone());
                plan.tasks.insert(name.to_string(), task);
            } else {
                let group = Arc::new(TaskGroup::new(name, refs));
                debug!(group = %name, "built group");
                plan.units.insert(name.to_string(), group.clone());
                plan.groups.insert(name.to_string(), group);
            }
        }

        Ok(plan)
    }

    /// Look a unit up by name.
    pub fn unit(&self, name: &str) -> Result<Arc<dyn Runnable>> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| TaskchainError::UnitNotFound(name.to_string()))
    }

    pub fn task(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn group(&self, name: &str) -> Option<&Arc<TaskGroup>> {
        self.groups.get(name)
    }

    pub fn default_unit(&self) -> Option<&str> {
        self.default_unit.as_deref()
    }

    /// Variables from `[vars]`.
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Register `observer` (weakly) on every task.
    pub fn observe_tasks<O: TaskObserver + 'static>(&self, observer: &Arc<O>) {
        for task in self.tasks.values() {
            task.set_observer(observer);
        }
    }

    /// Register `observer` (weakly) on every group.
    pub fn observe_groups<O: GroupObserver + 'static>(&self, observer: &Arc<O>) {
        for group in self.groups.values() {
            group.set_observer(observer);
        }
    }

    fn resolve_all(&self, names: &[String]) -> Result<Vec<Arc<dyn Runnable>>> {
        names.iter().map(|name| self.unit(name)).collect()
    }
}

/// Unit names ordered so that every unit comes after the units it references.
fn build_order(cfg: &ConfigFile) -> Result<Vec<&str>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in cfg.unit_names() {
        graph.add_node(name);
        for reference in cfg.references_of(name) {
            graph.add_edge(name, reference.as_str(), ());
        }
    }

    let mut order = toposort(&graph, None).map_err(|cycle| {
        TaskchainError::ReferenceCycle(format!(
            "cycle detected involving unit '{}'",
            cycle.node_id()
        ))
    })?;
    order.reverse();
    Ok(order)
}
