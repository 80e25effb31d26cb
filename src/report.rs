// src/report.rs

//! Console reporter used by the CLI.
//!
//! Streams task output straight through and prints a status line when a
//! task or group starts and ends. Group names are pushed onto the console's
//! prompt hierarchy while the group runs.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use console::Term;
use tracing::debug;

use crate::console::{format_elapsed_since, Color, Console, Status};
use crate::sync::lock;
use crate::types::{OutputChunk, StreamKind};
use crate::unit::{GroupObserver, Runnable, Task, TaskGroup, TaskObserver};

#[derive(Debug)]
pub struct ConsoleReporter {
    console: Arc<Console>,
    started: Mutex<HashMap<String, Instant>>,
}

impl ConsoleReporter {
    pub fn new(console: Arc<Console>) -> Self {
        Self {
            console,
            started: Mutex::new(HashMap::new()),
        }
    }

    fn start_clock(&self, key: String) {
        lock(&self.started).insert(key, Instant::now());
    }

    fn elapsed(&self, key: &str) -> String {
        lock(&self.started)
            .remove(key)
            .map(format_elapsed_since)
            .unwrap_or_else(|| "?".to_string())
    }
}

impl TaskObserver for ConsoleReporter {
    fn task_will_start(&self, task: &Task) {
        self.start_clock(format!("task:{}", task.name()));
        self.console.print_message_with(
            &format!("Running task '{}': {}", task.name(), task.script()),
            Status::Execute,
            Color::Cyan,
        );
    }

    fn task_did_produce_output(&self, _task: &Task, chunk: &OutputChunk) {
        let written = match chunk.stream {
            StreamKind::Stdout => {
                let mut out = Term::stdout();
                out.write_all(chunk.text.as_bytes()).and_then(|_| out.flush())
            }
            StreamKind::Stderr => {
                let mut err = Term::stderr();
                err.write_all(chunk.text.as_bytes()).and_then(|_| err.flush())
            }
        };
        if let Err(e) = written {
            debug!(error = %e, "failed to forward task output");
        }
    }

    fn task_did_end(&self, task: &Task, status: i32) {
        let elapsed = self.elapsed(&format!("task:{}", task.name()));
        match task_end_status(task, status) {
            Status::Success => self.console.print_success_message(&format!(
                "Task '{}' succeeded ({elapsed})",
                task.name()
            )),
            Status::Warning => self.console.print_warning_message(&format!(
                "Task '{}' failed with status {status} ({elapsed}); trying recovery",
                task.name()
            )),
            _ => self.console.print_error_message(&format!(
                "Task '{}' failed with status {status} ({elapsed})",
                task.name()
            )),
        }
    }
}

/// A failure is only a warning while recovery units remain to try.
fn task_end_status(task: &Task, status: i32) -> Status {
    if status == 0 {
        Status::Success
    } else if task.recovery_units().is_empty() {
        Status::Error
    } else {
        Status::Warning
    }
}

impl GroupObserver for ConsoleReporter {
    fn group_will_start(&self, group: &TaskGroup) {
        self.start_clock(format!("group:{}", group.name()));
        self.console.print_message_with(
            &format!("Running group '{}' ({} units)", group.name(), group.units().len()),
            Status::Target,
            Color::Purple,
        );
        self.console.add_prompt_part(group.name());
    }

    fn group_did_end(&self, group: &TaskGroup, success: bool) {
        self.console.remove_last_prompt_part();
        let elapsed = self.elapsed(&format!("group:{}", group.name()));
        if success {
            self.console.print_success_message(&format!(
                "Group '{}' completed ({elapsed})",
                group.name()
            ));
        } else {
            self.console.print_error_message(&format!(
                "Group '{}' failed ({elapsed})",
                group.name()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::errors::TaskError;
    use crate::exec::{ChunkSink, CommandExecutor, Invocation};
    use crate::types::{ExecutionResult, Variables};

    /// Succeeds for every command, remembering the prompt parts visible at
    /// the moment each one ran.
    #[derive(Debug)]
    struct PromptRecorder {
        console: Arc<Console>,
        seen: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl CommandExecutor for PromptRecorder {
        fn execute(
            &self,
            invocation: &Invocation,
            _on_chunk: &mut ChunkSink<'_>,
        ) -> Result<ExecutionResult, TaskError> {
            lock(&self.seen).push((invocation.command.clone(), self.console.prompt_parts()));
            Ok(ExecutionResult::default())
        }
    }

    fn quiet_console() -> Arc<Console> {
        let console = Console::with_color_support(false);
        console.set_icons_enabled(false);
        Arc::new(console)
    }

    #[test]
    fn nested_groups_push_and_pop_prompt_parts() {
        let console = quiet_console();
        console.set_prompt_parts(vec!["ci".to_string()]);

        let recorder = Arc::new(PromptRecorder {
            console: Arc::clone(&console),
            seen: Mutex::new(Vec::new()),
        });
        let task = |script: &str| {
            Arc::new(Task::builder(script).executor(recorder.clone()).build())
        };

        let inner = Arc::new(TaskGroup::new("inner", Vec::new()).with_shared_unit(task("build")));
        let outer = TaskGroup::new("outer", Vec::new())
            .with_shared_unit(task("fetch"))
            .with_shared_unit(inner.clone())
            .with_shared_unit(task("ship"));

        let reporter = Arc::new(ConsoleReporter::new(Arc::clone(&console)));
        outer.set_observer(&reporter);
        inner.set_observer(&reporter);
        assert!(outer.run(&Variables::new()));

        let parts = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        assert_eq!(
            *lock(&recorder.seen),
            vec![
                ("fetch".to_string(), parts(&["ci", "outer"])),
                ("build".to_string(), parts(&["ci", "outer", "inner"])),
                ("ship".to_string(), parts(&["ci", "outer"])),
            ]
        );
        assert_eq!(console.prompt_parts(), parts(&["ci"]));
        assert_eq!(console.prompt().as_deref(), Some("[ ci ]>"));
    }

    #[test]
    fn failed_group_still_pops_its_prompt_part() {
        #[derive(Debug)]
        struct Failing;

        impl CommandExecutor for Failing {
            fn execute(
                &self,
                _invocation: &Invocation,
                _on_chunk: &mut ChunkSink<'_>,
            ) -> Result<ExecutionResult, TaskError> {
                Ok(ExecutionResult {
                    exit_status: 1,
                    ..ExecutionResult::default()
                })
            }
        }

        let console = quiet_console();
        let group = TaskGroup::new("deploy", Vec::new())
            .with_unit(Task::builder("false").executor(Arc::new(Failing)).build());

        let reporter = Arc::new(ConsoleReporter::new(Arc::clone(&console)));
        group.set_observer(&reporter);

        assert!(!group.run(&Variables::new()));
        assert!(console.prompt_parts().is_empty());
        assert!(lock(&reporter.started).is_empty());
    }

    #[test]
    fn failure_is_a_warning_only_when_recovery_remains() {
        let plain = Task::new("false");
        let recoverable = Task::builder("false").recover(Task::new("true")).build();

        assert_eq!(task_end_status(&plain, 0), Status::Success);
        assert_eq!(task_end_status(&plain, 1), Status::Error);
        assert_eq!(task_end_status(&plain, -1), Status::Error);
        assert_eq!(task_end_status(&recoverable, 0), Status::Success);
        assert_eq!(task_end_status(&recoverable, 2), Status::Warning);
    }
}
