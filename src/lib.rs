// src/lib.rs

pub mod cli;
pub mod config;
pub mod console;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod report;
mod sync;
pub mod types;
pub mod unit;

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::console::{format_elapsed_since, Console};
use crate::errors::TaskchainError;
use crate::exec::ShellRunner;
use crate::plan::Plan;
use crate::report::ConsoleReporter;

pub use crate::errors::TaskError;
pub use crate::exec::{Invocation, Shell};
pub use crate::types::{ExecutionResult, OutputChunk, StreamKind, Variables};
pub use crate::unit::{spawn_run, Runnable, Task, TaskGroup};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the unit tree (plan)
/// - the console reporter
/// - Ctrl-C handling
///
/// Returns whether the selected unit succeeded.
pub fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let target = args
        .unit
        .clone()
        .or_else(|| cfg.default_unit().map(str::to_string))
        .ok_or_else(|| anyhow!("no unit to run: pass --unit or set [settings].default"))?;
    if !cfg.contains_unit(&target) {
        return Err(TaskchainError::UnitNotFound(target).into());
    }

    if args.dry_run {
        print_dry_run(&cfg, &target);
        return Ok(true);
    }

    let settings = cfg.settings();
    let console = Arc::new(Console::new());
    console.set_colors_enabled(settings.colors && !args.no_color);
    console.set_icons_enabled(settings.icons && !args.no_icons);
    if let Some(prompt) = settings.prompt.clone() {
        console.set_prompt_parts(vec![prompt]);
    }

    let runner = ShellRunner::new(settings.shell());
    cancel_on_ctrl_c(runner.cancellation_token())?;

    let plan = Plan::from_config(&cfg, Arc::new(runner))?;
    let reporter = Arc::new(ConsoleReporter::new(Arc::clone(&console)));
    plan.observe_tasks(&reporter);
    plan.observe_groups(&reporter);

    let mut variables = plan.variables().clone();
    variables.extend(args.variables());

    let unit = plan.unit(&target)?;
    info!(unit = %target, "running unit");
    let start = Instant::now();

    if unit.run(&variables) {
        console.print_success_message(&format!(
            "'{target}' completed in {}",
            format_elapsed_since(start)
        ));
        return Ok(true);
    }

    let error = unit.last_error();
    console.print_error(error.as_ref().map(|e| e as &dyn StdError));
    Ok(false)
}

/// Cancel `token` on Ctrl-C, which kills the running process.
fn cancel_on_ctrl_c(token: CancellationToken) -> Result<()> {
    std::thread::Builder::new()
        .name("taskchain-signal".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!(error = %e, "failed to start signal runtime; Ctrl-C will not cancel");
                    return;
                }
            };

            rt.block_on(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                info!("Ctrl-C received; cancelling");
                token.cancel();
            });
        })?;
    Ok(())
}

/// Simple dry-run output: print the unit tree below `root`.
fn print_dry_run(cfg: &ConfigFile, root: &str) {
    println!("taskchain dry-run");
    if let Some(ref shell) = cfg.settings().shell {
        println!("  settings.shell = {shell}");
    }
    println!("  settings.login = {}", cfg.settings().login);
    if !cfg.vars().is_empty() {
        println!("  vars: {:?}", cfg.vars());
    }
    println!();

    print_unit(cfg, root, 0);
    debug!("dry-run complete (no execution)");
}

fn print_unit(cfg: &ConfigFile, name: &str, depth: usize) {
    let indent = "  ".repeat(depth);

    if let Some(task) = cfg.tasks().get(name) {
        println!("{indent}- task {name}: {}", task.script);
        if let Some(ref timeout) = task.timeout {
            println!("{indent}    timeout: {timeout}");
        }
        if task.input.is_some() {
            println!("{indent}    input: <provided>");
        }
        if !task.recover.is_empty() {
            println!("{indent}    recover:");
            for recovery in task.recover.iter() {
                print_unit(cfg, recovery, depth + 3);
            }
        }
    } else if let Some(group) = cfg.groups().get(name) {
        println!("{indent}- group {name} ({} units)", group.units.len());
        for unit in group.units.iter() {
            print_unit(cfg, unit, depth + 1);
        }
    }
}
