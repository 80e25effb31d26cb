// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::exec::Shell;
use crate::types::Variables;

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [settings]
/// default = "release"
///
/// [vars]
/// TARGET = "prod"
///
/// [task.fetch]
/// script = "git pull"
/// recover = ["reset"]
///
/// [task.reset]
/// script = "git reset --hard origin/main"
///
/// [group.release]
/// units = ["fetch"]
/// ```
///
/// All sections are optional and have reasonable defaults. Convert to a
/// [`ConfigFile`] (via `TryFrom`) to validate it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: SettingsSection,

    /// Placeholder values available to every script.
    #[serde(default)]
    pub vars: Variables,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All groups from `[group.<name>]`.
    #[serde(default)]
    pub group: BTreeMap<String, GroupConfig>,
}

/// `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    /// Shell program; `$SHELL` (or `/bin/sh`) when omitted.
    #[serde(default)]
    pub shell: Option<String>,

    /// Whether the shell is started as a login shell (`-l`).
    #[serde(default = "default_true")]
    pub login: bool,

    /// Default timeout for every task, e.g. `"10m"`.
    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default = "default_true")]
    pub colors: bool,

    #[serde(default = "default_true")]
    pub icons: bool,

    /// Root prompt shown in front of every console line.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Unit to run when none is named on the command line.
    #[serde(default)]
    pub default: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            shell: None,
            login: true,
            timeout: None,
            colors: true,
            icons: true,
            prompt: None,
            default: None,
        }
    }
}

impl SettingsSection {
    /// The shell scripts are handed to.
    pub fn shell(&self) -> Shell {
        match &self.shell {
            Some(program) => Shell::new(program, self.login),
            None => {
                let env = Shell::from_env();
                Shell::new(env.program(), self.login)
            }
        }
    }

    pub fn default_timeout(&self) -> Result<Option<Duration>, String> {
        self.timeout.as_deref().map(parse_duration).transpose()
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Shell script to run.
    pub script: String,

    /// Units (tasks or groups) tried in order when the script fails.
    #[serde(default)]
    pub recover: Vec<String>,

    /// Text written to the script's standard input.
    #[serde(default)]
    pub input: Option<String>,

    /// Overrides `[settings].timeout`.
    #[serde(default)]
    pub timeout: Option<String>,
}

impl TaskConfig {
    /// Effective timeout given the default from `[settings]`.
    pub fn effective_timeout(
        &self,
        default: Option<Duration>,
    ) -> Result<Option<Duration>, String> {
        match self.timeout.as_deref() {
            Some(s) => parse_duration(s).map(Some),
            None => Ok(default),
        }
    }
}

/// `[group.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupConfig {
    /// Units run in order; the group stops at the first failure.
    #[serde(default)]
    pub units: Vec<String>,
}

/// A validated configuration.
///
/// Guarantees: unit names are unique across tasks and groups, every
/// reference resolves, there are no reference cycles, durations parse and
/// `settings.default` (if set) names a unit.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    settings: SettingsSection,
    vars: Variables,
    task: BTreeMap<String, TaskConfig>,
    group: BTreeMap<String, GroupConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        vars: Variables,
        task: BTreeMap<String, TaskConfig>,
        group: BTreeMap<String, GroupConfig>,
    ) -> Self {
        Self {
            settings,
            vars,
            task,
            group,
        }
    }

    pub fn settings(&self) -> &SettingsSection {
        &self.settings
    }

    pub fn vars(&self) -> &Variables {
        &self.vars
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn groups(&self) -> &BTreeMap<String, GroupConfig> {
        &self.group
    }

    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.task.keys().chain(self.group.keys()).map(String::as_str)
    }

    pub fn contains_unit(&self, name: &str) -> bool {
        self.task.contains_key(name) || self.group.contains_key(name)
    }

    /// Units a unit refers to: recovery units for a task, members for a group.
    pub fn references_of(&self, name: &str) -> &[String] {
        if let Some(task) = self.task.get(name) {
            &task.recover
        } else if let Some(group) = self.group.get(name) {
            &group.units
        } else {
            &[]
        }
    }

    pub fn default_unit(&self) -> Option<&str> {
        self.settings.default.as_deref()
    }
}
