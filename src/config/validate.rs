// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskchainError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskchainError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.settings,
            raw.vars,
            raw.task,
            raw.group,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_units(cfg)?;
    validate_names(cfg)?;
    validate_references(cfg)?;
    validate_durations(cfg)?;
    validate_default(cfg)?;
    validate_acyclic(cfg)?;
    Ok(())
}

fn ensure_has_units(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() && cfg.group.is_empty() {
        return Err(TaskchainError::ConfigError(
            "config must contain at least one [task.<name>] or [group.<name>] section"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.group.keys() {
        if cfg.task.contains_key(name) {
            return Err(TaskchainError::ConfigError(format!(
                "'{}' is defined both as a task and as a group",
                name
            )));
        }
    }

    for (name, task) in cfg.task.iter() {
        if task.script.trim().is_empty() {
            return Err(TaskchainError::ConfigError(format!(
                "task '{}' has an empty `script`",
                name
            )));
        }
    }
    Ok(())
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    let known = |name: &str| cfg.task.contains_key(name) || cfg.group.contains_key(name);

    let task_refs = cfg
        .task
        .iter()
        .map(|(name, task)| ("task", name, "recovery unit", &task.recover));
    let group_refs = cfg
        .group
        .iter()
        .map(|(name, group)| ("group", name, "unit", &group.units));

    for (kind, name, what, refs) in task_refs.chain(group_refs) {
        for reference in refs.iter() {
            if reference == name {
                return Err(TaskchainError::ConfigError(format!(
                    "{} '{}' cannot reference itself",
                    kind, name
                )));
            }
            if !known(reference.as_str()) {
                return Err(TaskchainError::ConfigError(format!(
                    "{} '{}' has unknown {} '{}'",
                    kind, name, what, reference
                )));
            }
        }
    }
    Ok(())
}

fn validate_durations(cfg: &RawConfigFile) -> Result<()> {
    if let Some(ref timeout) = cfg.settings.timeout {
        parse_duration(timeout).map_err(|e| {
            TaskchainError::ConfigError(format!("[settings].timeout: {e}"))
        })?;
    }

    for (name, task) in cfg.task.iter() {
        if let Some(ref timeout) = task.timeout {
            parse_duration(timeout).map_err(|e| {
                TaskchainError::ConfigError(format!("task '{}' timeout: {e}", name))
            })?;
        }
    }
    Ok(())
}

fn validate_default(cfg: &RawConfigFile) -> Result<()> {
    if let Some(ref default) = cfg.settings.default {
        if !cfg.task.contains_key(default) && !cfg.group.contains_key(default) {
            return Err(TaskchainError::ConfigError(format!(
                "[settings].default names unknown unit '{}'",
                default
            )));
        }
    }
    Ok(())
}

fn validate_acyclic(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: unit -> referenced unit.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys().chain(cfg.group.keys()) {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        for reference in task.recover.iter() {
            graph.add_edge(name.as_str(), reference.as_str(), ());
        }
    }
    for (name, group) in cfg.group.iter() {
        for reference in group.units.iter() {
            graph.add_edge(name.as_str(), reference.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskchainError::ReferenceCycle(format!(
            "cycle detected involving unit '{}'",
            cycle.node_id()
        ))),
    }
}
