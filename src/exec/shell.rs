// src/exec/shell.rs

use std::path::{Path, PathBuf};

use tokio::process::Command;

const FALLBACK_SHELL: &str = "/bin/sh";

/// The shell a command string is handed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: PathBuf,
    login: bool,
}

impl Shell {
    pub fn new(program: impl Into<PathBuf>, login: bool) -> Self {
        Self {
            program: program.into(),
            login,
        }
    }

    /// The user's login shell from `$SHELL`, or `/bin/sh`.
    pub fn from_env() -> Self {
        let program = std::env::var_os("SHELL")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_SHELL));
        Self::new(program, true)
    }

    /// Plain non-login `/bin/sh`.
    pub fn sh() -> Self {
        Self::new(FALLBACK_SHELL, false)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn is_login(&self) -> bool {
        self.login
    }

    /// Build the process that interprets `script`.
    pub(crate) fn command(&self, script: &str) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(script);
            c
        } else {
            let mut c = Command::new(&self.program);
            if self.login {
                c.arg("-l");
            }
            c.arg("-c").arg(script);
            c
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::from_env()
    }
}
