//! Integration tests for the `linkhound` binary, driven against the
//! recorded lab snapshots under `demos/lab/` -- no live agents needed.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn demo_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos/lab")
        .join(name)
}

fn linkhound_cmd() -> Command {
    let mut cmd = Command::cargo_bin("linkhound").unwrap();
    cmd.env_remove("LINKHOUND_CONFIG")
        .env_remove("LINKHOUND_SCHEDULER__SNMP_COMMUNITY");
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = linkhound_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(text.contains("Usage"), "expected usage text:\n{text}");
}

#[test]
fn help_flag() {
    linkhound_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("SNMP collection")
            .and(predicate::str::contains("discover"))
            .and(predicate::str::contains("validate")),
    );
}

#[test]
fn version_flag() {
    linkhound_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("linkhound"));
}

// ── validate ────────────────────────────────────────────────────────

#[test]
fn validate_demo_config_and_inventory() {
    linkhound_cmd()
        .arg("--config")
        .arg(demo_path("linkhound.toml"))
        .arg("validate")
        .arg("--inventory")
        .arg(demo_path("inventory.toml"))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("config ok: 1 package(s)")
                .and(predicate::str::contains("inventory ok: 2 node(s)"))
                .and(predicate::str::contains("package lab: 2/2 member(s)")),
        );
}

#[test]
fn validate_missing_config_uses_defaults() {
    linkhound_cmd()
        .arg("--config")
        .arg("/nonexistent/linkhound.toml")
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("config ok: 0 package(s)"));
}

// ── discover ────────────────────────────────────────────────────────

#[test]
fn discover_lab_package_finds_the_link() {
    linkhound_cmd()
        .arg("--config")
        .arg(demo_path("linkhound.toml"))
        .arg("discover")
        .arg("--package")
        .arg("lab")
        .arg("--inventory")
        .arg(demo_path("inventory.toml"))
        .arg("--snapshots")
        .arg(demo_path("snapshots"))
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha:10").and(predicate::str::contains("beta:20")))
        .stderr(predicate::str::contains("1 link(s) in package lab"));
}

#[test]
fn discover_unknown_package_fails() {
    linkhound_cmd()
        .arg("--config")
        .arg(demo_path("linkhound.toml"))
        .arg("discover")
        .arg("--package")
        .arg("nope")
        .arg("--inventory")
        .arg(demo_path("inventory.toml"))
        .arg("--snapshots")
        .arg(demo_path("snapshots"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown package"));
}

#[test]
fn discover_json_output() {
    linkhound_cmd()
        .arg("--config")
        .arg(demo_path("linkhound.toml"))
        .arg("-o")
        .arg("json")
        .arg("discover")
        .arg("--package")
        .arg("lab")
        .arg("--inventory")
        .arg(demo_path("inventory.toml"))
        .arg("--snapshots")
        .arg(demo_path("snapshots"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"method\": \"lldp\""));
}
