//! Integration tests for `workbay config`.
//!
//! All tests set `WORKBAY_CONFIG` to a temp path so they never read or write
//! `~/.workbay/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn workbay() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("workbay"));
    cmd.arg("--no-color");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

#[test]
fn test_config_help_shows_subcommands() {
    workbay()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("set"));
}

#[test]
fn test_config_path_honours_env() {
    let (_dir, path) = temp_config_path();
    workbay()
        .args(["config", "path"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains(path.as_str()));
}

#[test]
fn test_config_show_without_file_uses_defaults() {
    let (_dir, path) = temp_config_path();
    workbay()
        .args(["config", "show"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("engine.machine_type:"))
        .stdout(predicate::str::contains("docker"))
        .stdout(predicate::str::contains("2000"));
}

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    workbay()
        .args(["config", "set", "engine.machine_type", "podman"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set engine.machine_type = podman"));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("machine_type: podman"), "got: {content}");

    let out = workbay()
        .args(["--json", "config", "show"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["engine"]["machine_type"], "podman");
}

#[test]
fn test_config_set_unknown_key_lists_valid_keys() {
    let (_dir, path) = temp_config_path();
    workbay()
        .args(["config", "set", "engine.colour", "blue"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting: engine.colour"))
        .stderr(predicate::str::contains("agents.http_probe_timeout_ms"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_rejects_non_numeric_timeout() {
    let (_dir, path) = temp_config_path();
    workbay()
        .args(["config", "set", "agents.http_probe_timeout_ms", "fast"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for agents.http_probe_timeout_ms"));
}

#[test]
fn test_invalid_agent_override_is_rejected_on_load() {
    let (_dir, path) = temp_config_path();
    std::fs::write(
        &path,
        "agents:\n  overrides:\n    - id: workbay.ssh\n      script: sshd\n      maxStartTimeMs: 10\n      pollIntervalMs: 500\n",
    )
    .unwrap();
    workbay()
        .args(["agents", "list"])
        .env("WORKBAY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("workbay.ssh"))
        .stderr(predicate::str::contains("pollIntervalMs"));
}
