// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running shell commands, using
//! `tokio::process::Command`, and reporting output and exit status back to
//! the caller.
//!
//! - [`shell`] decides which program interprets a command string.
//! - [`variables`] applies `$NAME` / `${NAME}` substitution before spawn.
//! - [`decode`] turns raw pipe reads into UTF-8 text.
//! - [`runner`] owns [`ShellRunner`], with blocking, async and
//!   background-thread entry points.
//! - [`backend`] provides the `CommandExecutor` trait that tasks use, which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod decode;
pub mod runner;
pub mod shell;
pub mod variables;

pub use backend::{ChunkSink, CommandExecutor, Invocation};
pub use runner::{AsyncRun, ShellRunner};
pub use shell::Shell;
pub use variables::substitute;
