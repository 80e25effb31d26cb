mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};
use crate::common::write_config;

use taskchain::config::load_and_validate;
use taskchain::errors::TaskchainError;

#[test]
fn test_reference_cycle_returns_structured_error() {
    let file = write_config(
        r#"
[task.A]
script = "echo A"
recover = ["B"]

[group.B]
units = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TaskchainError::ReferenceCycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains("A") || msg.contains("B"));
        }
        Err(e) => panic!("Expected ReferenceCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_self_reference_is_rejected() {
    let result = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").recover("A").build())
        .try_build();

    match result {
        Err(TaskchainError::ConfigError(msg)) => {
            assert!(msg.contains("cannot reference itself"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_recovery_unit_returns_config_error() {
    let file = write_config(
        r#"
[task.A]
script = "echo A"
recover = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(TaskchainError::ConfigError(msg)) => {
            assert!(msg.contains("unknown recovery unit"));
            assert!(msg.contains("NonExistent"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_group_member_returns_config_error() {
    let result = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").build())
        .with_group("G", &["A", "Missing"])
        .try_build();

    match result {
        Err(TaskchainError::ConfigError(msg)) => {
            assert!(msg.contains("unknown unit 'Missing'"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_name_shared_by_task_and_group_is_rejected() {
    let result = ConfigFileBuilder::new()
        .with_task("build", TaskConfigBuilder::new("make").build())
        .with_group("build", &[])
        .try_build();

    assert!(matches!(result, Err(TaskchainError::ConfigError(_))));
}

#[test]
fn test_empty_config_is_rejected() {
    let result = ConfigFileBuilder::new().try_build();
    assert!(matches!(result, Err(TaskchainError::ConfigError(_))));
}

#[test]
fn test_empty_script_is_rejected() {
    let result = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("   ").build())
        .try_build();
    assert!(matches!(result, Err(TaskchainError::ConfigError(_))));
}

#[test]
fn test_bad_duration_is_rejected() {
    let result = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").timeout("soon").build())
        .try_build();

    match result {
        Err(TaskchainError::ConfigError(msg)) => assert!(msg.contains("task 'A' timeout")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    let result = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").build())
        .default_timeout("5 parsecs")
        .try_build();
    assert!(matches!(result, Err(TaskchainError::ConfigError(_))));
}

#[test]
fn test_unknown_default_unit_is_rejected() {
    let result = ConfigFileBuilder::new()
        .with_task("A", TaskConfigBuilder::new("echo A").build())
        .default_unit("B")
        .try_build();

    match result {
        Err(TaskchainError::ConfigError(msg)) => assert!(msg.contains("'B'")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = write_config("[task.A\nscript = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(TaskchainError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("nope.toml"));
    assert!(matches!(result, Err(TaskchainError::IoError(_))));
}

#[test]
fn test_full_config_loads() {
    let file = write_config(
        r#"
[settings]
shell = "/bin/sh"
login = false
timeout = "1m"
prompt = "ci"
default = "release"

[vars]
TARGET = "prod"

[task.fetch]
script = "git pull"
recover = ["reset"]

[task.reset]
script = "git reset --hard"
timeout = "30s"

[task.deploy]
script = "deploy $TARGET"
input = "yes\n"

[group.release]
units = ["fetch", "deploy"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.default_unit(), Some("release"));
    assert_eq!(cfg.vars().get("TARGET").map(String::as_str), Some("prod"));
    assert_eq!(cfg.references_of("fetch"), ["reset".to_string()]);
    assert_eq!(cfg.references_of("release").len(), 2);
    assert!(cfg.contains_unit("reset"));
    assert!(!cfg.settings().shell().is_login());
    assert_eq!(
        cfg.settings().default_timeout().unwrap(),
        Some(std::time::Duration::from_secs(60))
    );
}

#[test]
fn test_overflowing_duration_is_a_config_error() {
    let file = write_config(
        r#"
[task.a]
script = "true"
timeout = "99999999999999999h"
"#,
    );

    match load_and_validate(file.path()) {
        Err(TaskchainError::ConfigError(msg)) => {
            assert!(msg.contains("task 'a' timeout"));
            assert!(msg.contains("too large"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_largest_representable_timeout_still_runs() {
    use std::sync::Arc;

    use taskchain::exec::{Shell, ShellRunner};
    use taskchain::plan::Plan;
    use taskchain::unit::Runnable;

    let file = write_config(
        r#"
[task.a]
script = "true"
timeout = "18446744073709551615s"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let plan = Plan::from_config(&cfg, Arc::new(ShellRunner::new(Shell::sh()))).unwrap();
    assert!(plan.unit("a").unwrap().run(plan.variables()));
}
