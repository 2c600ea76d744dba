#![allow(deprecated)] // TODO: move from Command::cargo_bin to cargo_bin_cmd!

mod common;

use assert_cmd::Command;
use common::{TestProject, VM_ID, sample_kdl};
use predicates::prelude::*;

fn settle() -> Command {
    let mut cmd = Command::cargo_bin("settle").unwrap();
    cmd.env_remove("SETTLE_CONFIG_PATH")
        .env_remove("SETTLE_ARM_TOKEN")
        .env_remove("SETTLE_ARM_ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    settle()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_cli_version() {
    settle()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("settleflow"));
}

#[test]
fn test_apply_help() {
    settle()
        .args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[FILE]"))
        .stdout(predicate::str::contains("--interval"))
        .stdout(predicate::str::contains("--debounce"));
}

#[test]
fn test_invalid_command() {
    settle().arg("invalid-command").assert().failure();
}

#[test]
fn test_validate_discovers_settle_kdl() {
    let project = TestProject::new();
    project.write_settle_kdl(&sample_kdl());

    settle()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resource file is valid"))
        .stdout(predicate::str::contains("sqlvm1"))
        .stdout(predicate::str::contains("auto_backup, auto_patching"));
}

#[test]
fn test_validate_explicit_file() {
    let project = TestProject::new();
    let path = project.write_file("other.kdl", &sample_kdl());

    settle()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("SQL virtual machines: 1"));
}

#[test]
fn test_validate_config_path_env() {
    let project = TestProject::new();
    let path = project.write_file("custom.kdl", &sample_kdl());

    settle()
        .current_dir(std::env::temp_dir())
        .env("SETTLE_CONFIG_PATH", &path)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.kdl"));
}

#[test]
fn test_validate_reports_rule_violations() {
    let project = TestProject::new();
    project.write_settle_kdl(&format!(
        r#"sql_virtual_machine "sqlvm1" {{
    virtual_machine_id "{VM_ID}"
    sql_license_type "PAYG"
    sql_connectivity_port 80
    auto_patching {{ day_of_week "Someday"; maintenance_window_duration_in_minutes 60; maintenance_window_starting_hour 2 }}
}}
"#
    ));

    settle()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("sql_connectivity_port"))
        .stderr(predicate::str::contains("day_of_week"));
}

#[test]
fn test_validate_rejects_unknown_node() {
    let project = TestProject::new();
    project.write_settle_kdl("service \"web\" { image \"nginx\" }\n");

    settle()
        .current_dir(project.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown node"));
}

#[test]
fn test_validate_without_resource_file() {
    let project = TestProject::new();

    settle()
        .current_dir(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join(".config"))
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resource file not found"));
}

#[test]
fn test_plan_requires_token() {
    let project = TestProject::new();
    project.write_settle_kdl(&sample_kdl());

    settle()
        .current_dir(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join(".config"))
        .arg("plan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SETTLE_ARM_TOKEN"));
}

#[test]
fn test_show_rejects_malformed_id() {
    settle()
        .args(["show", VM_ID])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid resource id"));
}

#[test]
fn test_destroy_unknown_name() {
    let project = TestProject::new();
    project.write_settle_kdl(&sample_kdl());

    settle()
        .current_dir(project.path())
        .args(["destroy", "missing", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not declared"));
}
