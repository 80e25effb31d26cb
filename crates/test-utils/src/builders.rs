#![allow(dead_code)]

use taskchain::config::{ConfigFile, GroupConfig, RawConfigFile, TaskConfig};
use taskchain::errors::TaskchainError;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_group(mut self, name: &str, units: &[&str]) -> Self {
        self.config.group.insert(
            name.to_string(),
            GroupConfig {
                units: units.iter().map(|u| u.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.config.vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn default_unit(mut self, name: &str) -> Self {
        self.config.settings.default = Some(name.to_string());
        self
    }

    pub fn default_timeout(mut self, timeout: &str) -> Self {
        self.config.settings.timeout = Some(timeout.to_string());
        self
    }

    pub fn try_build(self) -> Result<ConfigFile, TaskchainError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(script: &str) -> Self {
        Self {
            task: TaskConfig {
                script: script.to_string(),
                recover: vec![],
                input: None,
                timeout: None,
            },
        }
    }

    pub fn recover(mut self, unit: &str) -> Self {
        self.task.recover.push(unit.to_string());
        self
    }

    pub fn input(mut self, input: &str) -> Self {
        self.task.input = Some(input.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.task.timeout = Some(timeout.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
