//! End-to-end tests for `convert`, `validate`, `agents` and `version`.
//!
//! Every invocation points `WORKBAY_CONFIG` at a temp path so the user's
//! `~/.workbay/config.yaml` is never read.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const WEB_DB: &str = r#"
recipe:
  type: compose
  services:
    web:
      image: nginx:1.27
      depends_on: [db]
    db:
      image: postgres:16
      expose: ["5432"]
machines:
  web:
    agents: [workbay.ws-agent]
  db:
    attributes: { memoryLimitBytes: "536870912" }
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    fn workbay(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("workbay"));
        cmd.env("WORKBAY_CONFIG", self.dir.path().join("config.yaml"))
            .env_remove("RUST_LOG")
            .arg("--no-color");
        cmd
    }
}

#[test]
fn test_help_lists_commands() {
    Fixture::new()
        .workbay()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("agents"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_json() {
    let out = Fixture::new()
        .workbay()
        .args(["--json", "version"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_convert_prints_provisioned_model() {
    let fx = Fixture::new();
    let env = fx.file("env.yaml", WEB_DB);
    fx.workbay()
        .arg("convert")
        .arg(&env)
        .args(["--workspace", "ws9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5432"))
        .stdout(predicate::str::contains("5432/tcp").not())
        .stdout(predicate::str::contains("4401/tcp"))
        .stdout(predicate::str::contains("WORKBAY_WORKSPACE_ID: ws9"))
        .stdout(predicate::str::contains("mem_limit: 536870912"));
}

#[test]
fn test_convert_json_is_machine_readable() {
    let fx = Fixture::new();
    let env = fx.file("env.yaml", WEB_DB);
    let out = fx
        .workbay()
        .args(["--json", "convert"])
        .arg(&env)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["machines"]["web"]["image"], "nginx:1.27");
    assert_eq!(value["machines"]["web"]["depends_on"][0], "db");
    assert_eq!(value["machines"]["db"]["expose"], serde_json::json!(["5432"]));
}

#[test]
fn test_validate_reports_start_order() {
    let fx = Fixture::new();
    let env = fx.file("env.yaml", WEB_DB);
    fx.workbay()
        .arg("validate")
        .arg(&env)
        .assert()
        .success()
        .stdout(predicate::str::contains("Environment is valid"))
        .stdout(predicate::str::contains("db → web"))
        .stdout(predicate::str::contains("web"));
}

#[test]
fn test_validate_accepts_json_files() {
    let fx = Fixture::new();
    let env = fx.file(
        "env.json",
        r#"{"recipe": {"type": "image", "image": "alpine:3"}, "machines": {"dev": {}}}"#,
    );
    let out = fx
        .workbay()
        .args(["--json", "validate"])
        .arg(&env)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["valid"], true);
    assert_eq!(value["recipe"], "image");
    assert_eq!(value["start_order"][0], "dev");
}

#[test]
fn test_validate_dangling_dependency_fails() {
    let fx = Fixture::new();
    let env = fx.file("env.yaml", &WEB_DB.replace("depends_on: [db]", "depends_on: [queue]"));
    fx.workbay()
        .arg("validate")
        .arg(&env)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("unknown machine 'queue'"));
}

#[test]
fn test_validate_error_json_has_code() {
    let fx = Fixture::new();
    let env = fx.file("env.yaml", &WEB_DB.replace("depends_on: [db]", "depends_on: [queue]"));
    let out = fx
        .workbay()
        .args(["--json", "validate"])
        .arg(&env)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "VALIDATION");
}

#[test]
fn test_validate_unknown_agent_fails() {
    let fx = Fixture::new();
    let env = fx.file("env.yaml", &WEB_DB.replace("[workbay.ws-agent]", "[workbay.ws-agent, acme.nope]"));
    fx.workbay()
        .arg("validate")
        .arg(&env)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown agent 'acme.nope'"));
}

#[test]
fn test_missing_file_is_reported() {
    let fx = Fixture::new();
    fx.workbay()
        .args(["validate", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn test_agents_list_json_contains_builtins() {
    let out = Fixture::new()
        .workbay()
        .args(["--json", "agents", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let ids: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["id"].as_str())
        .collect();
    assert_eq!(ids, ["workbay.ws-agent", "workbay.terminal", "workbay.ssh"]);
}

#[test]
fn test_agents_info_shows_default_check() {
    Fixture::new()
        .workbay()
        .args(["agents", "info", "workbay.ssh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sshd"))
        .stdout(predicate::str::contains("22/tcp"));
}

#[test]
fn test_agents_info_unknown_fails() {
    Fixture::new()
        .workbay()
        .args(["agents", "info", "acme.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown agent"));
}
