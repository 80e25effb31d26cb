mod common;
use crate::common::fake_executor::{Response, ScriptedExecutor};
use crate::common::{init_tracing, sh_executor, wait_until};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskchain::errors::TaskError;
use taskchain::types::Variables;
use taskchain::unit::{spawn_run, GroupObserver, Runnable, Task, TaskGroup};

fn scripted_task(executor: &Arc<ScriptedExecutor>, script: &str) -> Arc<dyn Runnable> {
    Arc::new(
        Task::builder(script)
            .executor(executor.clone())
            .build(),
    )
}

fn no_vars() -> Variables {
    Variables::new()
}

#[test]
fn group_runs_units_in_order() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new());
    let group = TaskGroup::new(
        "all",
        vec![
            scripted_task(&executor, "one"),
            scripted_task(&executor, "two"),
            scripted_task(&executor, "three"),
        ],
    );

    assert!(group.run(&no_vars()));
    assert_eq!(executor.executed(), vec!["one", "two", "three"]);
    assert_eq!(group.last_error(), None);
    assert!(group.current_unit().is_none());
}

#[test]
fn group_stops_at_the_first_failure() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new().respond("two", Response::status(5)));
    let u2 = scripted_task(&executor, "two");
    let group = TaskGroup::new(
        "all",
        vec![
            scripted_task(&executor, "one"),
            u2.clone(),
            scripted_task(&executor, "three"),
        ],
    );

    assert!(!group.run(&no_vars()));
    assert_eq!(executor.executed(), vec!["one", "two"]);
    assert_eq!(group.last_error(), u2.last_error());
    assert_eq!(group.last_error().unwrap().exit_status(), Some(5));
    assert!(group.current_unit().is_none());
    assert!(!group.is_running());
}

#[test]
fn empty_group_succeeds() {
    init_tracing();

    let group = TaskGroup::new("empty", Vec::new());
    assert!(group.run(&no_vars()));
    assert_eq!(group.last_error(), None);
}

#[test]
fn success_clears_a_previous_error() {
    init_tracing();

    let marker = tempfile::tempdir().unwrap();
    let flag = marker.path().join("flag");
    let script = format!("test -e '{}'", flag.display());

    let group = TaskGroup::new("check", Vec::new())
        .with_unit(Task::builder(&script).executor(sh_executor()).build());

    assert!(!group.run(&no_vars()));
    assert!(group.last_error().is_some());

    std::fs::write(&flag, "").unwrap();
    assert!(group.run(&no_vars()));
    assert_eq!(group.last_error(), None);
}

#[test]
fn groups_nest_and_serve_as_recovery() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new().respond("deploy", Response::status(1)));
    let rollback = Arc::new(TaskGroup::new(
        "rollback",
        vec![
            scripted_task(&executor, "restore"),
            scripted_task(&executor, "restart"),
        ],
    ));
    let deploy = Arc::new(
        Task::builder("deploy")
            .executor(executor.clone())
            .recover_shared(rollback.clone())
            .build(),
    );
    let release = TaskGroup::new("release", vec![scripted_task(&executor, "build")])
        .with_shared_unit(deploy.clone())
        .with_unit(TaskGroup::new("notify", vec![scripted_task(&executor, "mail")]));

    assert!(release.run(&no_vars()));
    assert_eq!(
        executor.executed(),
        vec!["build", "deploy", "restore", "restart", "mail"]
    );
    assert_eq!(deploy.last_error(), None);
    assert_eq!(rollback.last_error(), None);
}

#[test]
fn current_unit_tracks_the_running_child() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new());
    let gate = executor.gate("slow");
    let first = scripted_task(&executor, "fast");
    let second = scripted_task(&executor, "slow");
    let group = Arc::new(TaskGroup::new("seq", vec![first, second.clone()]));

    assert!(group.current_unit().is_none());
    let handle = spawn_run(group.clone(), no_vars()).unwrap();

    assert!(gate.wait_entered(Duration::from_secs(5)));
    assert!(group.is_running());
    assert_eq!(group.current_index(), Some(1));
    let current = group.current_unit().unwrap();
    assert_eq!(current.name(), "slow");
    assert!(second.is_running());

    gate.open();
    assert!(handle.join().unwrap());
    assert!(group.current_unit().is_none());
    assert!(!group.is_running());
}

#[test]
fn running_a_running_task_is_rejected_without_side_effects() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new());
    let gate = executor.gate("blocked");
    let task = scripted_task(&executor, "blocked");

    let handle = spawn_run(task.clone(), no_vars()).unwrap();
    assert!(gate.wait_entered(Duration::from_secs(5)));

    let err = task.try_run(&no_vars()).unwrap_err();
    assert_eq!(
        err,
        TaskError::AlreadyRunning {
            unit: "blocked".to_string()
        }
    );
    assert!(task.is_running());
    assert_eq!(task.last_error(), None);
    assert_eq!(executor.count("blocked"), 1);

    gate.open();
    assert!(handle.join().unwrap());
    assert_eq!(task.last_error(), None);
}

#[test]
fn running_a_running_group_is_rejected() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new());
    let gate = executor.gate("blocked");
    let group = Arc::new(TaskGroup::new(
        "busy",
        vec![scripted_task(&executor, "blocked")],
    ));

    let handle = spawn_run(group.clone(), no_vars()).unwrap();
    assert!(gate.wait_entered(Duration::from_secs(5)));

    assert!(!group.run(&no_vars()));
    assert_eq!(group.current_index(), Some(0));
    assert_eq!(group.last_error(), None);

    gate.open();
    assert!(handle.join().unwrap());
    assert!(wait_until(Duration::from_secs(1), || !group.is_running()));
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl GroupObserver for Recorder {
    fn group_will_start(&self, group: &TaskGroup) {
        self.events.lock().unwrap().push(format!("start {}", group.name()));
    }

    fn unit_will_run(&self, group: &TaskGroup, index: usize, unit: &dyn Runnable) {
        assert_eq!(group.current_index(), Some(index));
        self.events
            .lock()
            .unwrap()
            .push(format!("unit {index} {}", unit.name()));
    }

    fn group_did_end(&self, group: &TaskGroup, success: bool) {
        assert!(group.current_unit().is_none());
        self.events
            .lock()
            .unwrap()
            .push(format!("end {} {success}", group.name()));
    }
}

#[test]
fn observer_sees_each_unit_start() {
    init_tracing();

    let executor = Arc::new(ScriptedExecutor::new().respond("b", Response::status(1)));
    let group = TaskGroup::new(
        "g",
        vec![
            scripted_task(&executor, "a"),
            scripted_task(&executor, "b"),
            scripted_task(&executor, "c"),
        ],
    );

    let recorder = Arc::new(Recorder::default());
    group.set_observer(&recorder);
    assert!(!group.run(&no_vars()));

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start g", "unit 0 a", "unit 1 b", "end g false"]
    );

    group.clear_observer();
    assert!(!group.run(&no_vars()));
    assert_eq!(recorder.events.lock().unwrap().len(), 4);
}
