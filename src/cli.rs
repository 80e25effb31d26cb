// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::Variables;

/// Command-line arguments for `taskchain`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskchain",
    version,
    about = "Run shell tasks with recovery chains and fail-fast groups.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Taskchain.toml")]
    pub config: String,

    /// Task or group to run.
    ///
    /// Default: `[settings].default` from the config file.
    #[arg(long, value_name = "NAME")]
    pub unit: Option<String>,

    /// Placeholder value, overriding `[vars]` (repeatable).
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKCHAIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the unit tree, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Disable coloured output.
    #[arg(long)]
    pub no_color: bool,

    /// Disable status icons.
    #[arg(long)]
    pub no_icons: bool,
}

impl CliArgs {
    /// `--var` values as a variable map.
    pub fn variables(&self) -> Variables {
        self.vars.iter().cloned().collect()
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid variable '{s}': expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid variable '{s}': empty name"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
