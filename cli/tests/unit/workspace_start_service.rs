//! Workspace start orchestration against mocked engine and HTTP probe.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use tokio_util::sync::CancellationToken;
use workbay_cli::application::registry::MachineRegistry;
use workbay_cli::application::services::agent_launch::LaunchSettings;
use workbay_cli::application::services::workspace_start::{
    StartOutcome, StartRequest, start_workspace,
};
use workbay_cli::application::services::workspace_stop::stop_workspace;
use workbay_cli::domain::agent::LaunchState;
use workbay_cli::domain::config::builtin_agents;
use workbay_cli::domain::environment::env_vars;
use workbay_cli::domain::error::{LaunchError, StartError, ValidationError};
use workbay_cli::domain::machine::{MachineStatus, RuntimeIdentity};
use workbay_common::{AgentDescriptor, DeclaredEnvironment, agent_ids};

use crate::mocks::{MockEngine, MockHttp, RecordingReporter};

const WEB_DB: &str = r#"
recipe:
  type: compose
  services:
    web:
      image: nginx:1.27
      depends_on: [db]
    db:
      image: postgres:16
machines:
  web:
    agents: [workbay.ws-agent, workbay.terminal]
  db:
    servers:
      postgres: { port: "5432", attributes: { internal: "true" } }
"#;

fn declared(yaml: &str) -> DeclaredEnvironment {
    serde_yaml::from_str(yaml).expect("valid yaml")
}

fn identity() -> RuntimeIdentity {
    RuntimeIdentity {
        workspace_id: "ws1".into(),
        env_name: "default".into(),
        owner: "dev".into(),
    }
}

/// Built-in agents with short timings so failures surface quickly.
fn fast_agents() -> Vec<AgentDescriptor> {
    builtin_agents()
        .into_iter()
        .map(|mut a| {
            a.max_start_time_ms = 500;
            a.poll_interval_ms = 50;
            a
        })
        .collect()
}

async fn start(
    engine: &MockEngine,
    http: &MockHttp,
    registry: &MachineRegistry,
    cancel: &CancellationToken,
    declared: &DeclaredEnvironment,
) -> Result<StartOutcome, StartError> {
    let agents = fast_agents();
    let providers = env_vars::default_providers(None);
    let settings = LaunchSettings::default();
    start_workspace(
        engine,
        http,
        registry,
        &RecordingReporter::default(),
        cancel,
        StartRequest {
            declared,
            identity: identity(),
            agents: &agents,
            providers: &providers,
            settings: &settings,
        },
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn all_agents_live_gives_running_workspace() {
    let engine = MockEngine::new().live_after("workbay-terminal", 2);
    let http = MockHttp::answering(200);
    let registry = MachineRegistry::new();

    let outcome = start(
        &engine,
        &http,
        &registry,
        &CancellationToken::new(),
        &declared(WEB_DB),
    )
    .await
    .expect("start");

    let StartOutcome::Running(workspace) = outcome else {
        panic!("expected running workspace");
    };
    assert_eq!(*engine.started.borrow(), ["db", "web"]);
    assert_eq!(workspace.machines.len(), 2);
    assert_eq!(workspace.agents.len(), 2);
    assert!(workspace.agents.iter().all(|a| a.state() == LaunchState::Live));
    assert!(workspace.agents.iter().all(|a| a.machine == "web"));
    assert_eq!(
        registry.dev_machine("ws1").unwrap().handle.container_id,
        "cid-web"
    );
    assert_eq!(http.urls.borrow()[0], "http://127.0.0.1:4401/api");
}

#[tokio::test(start_paused = true)]
async fn failing_terminal_degrades_the_workspace() {
    let engine = MockEngine::new().never_live("workbay-terminal");
    let http = MockHttp::answering(200);
    let registry = MachineRegistry::new();

    let outcome = start(
        &engine,
        &http,
        &registry,
        &CancellationToken::new(),
        &declared(WEB_DB),
    )
    .await
    .expect("start");

    let StartOutcome::Degraded { workspace, failures } = outcome else {
        panic!("expected degraded workspace");
    };
    assert_eq!(failures.len(), 1);
    assert!(matches!(&failures[0], LaunchError::Timeout { agent, .. } if agent == agent_ids::TERMINAL));
    assert_eq!(workspace.agents[0].agent, agent_ids::WS_AGENT);
    assert!(engine.destroyed.borrow().is_empty());
    assert_eq!(registry.list_workspace("ws1").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn failing_ws_agent_stops_everything() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(503);
    let registry = MachineRegistry::new();

    let err = start(
        &engine,
        &http,
        &registry,
        &CancellationToken::new(),
        &declared(WEB_DB),
    )
    .await
    .expect_err("ws-agent never healthy");

    let StartError::Agent(LaunchError::Timeout { agent, .. }) = err else {
        panic!("expected ws-agent timeout, got {err:?}");
    };
    assert_eq!(agent, agent_ids::WS_AGENT);
    let mut destroyed = engine.destroyed.borrow().clone();
    destroyed.sort();
    assert_eq!(destroyed, ["cid-db", "cid-web"]);
    assert!(registry.list_workspace("ws1").is_empty());
}

#[tokio::test(start_paused = true)]
async fn container_failure_rolls_back_started_machines() {
    let engine = MockEngine::new().failing_start("web");
    let http = MockHttp::answering(200);
    let registry = MachineRegistry::new();

    let err = start(
        &engine,
        &http,
        &registry,
        &CancellationToken::new(),
        &declared(WEB_DB),
    )
    .await
    .expect_err("web fails");

    assert!(matches!(&err, StartError::Engine { machine, .. } if machine == "web"));
    assert_eq!(*engine.destroyed.borrow(), ["cid-db"]);
    assert!(registry.list().is_empty());
    assert!(engine.scripts.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unknown_agent_is_rejected_before_any_container() {
    let yaml = WEB_DB.replace("workbay.terminal", "acme.unknown");
    let engine = MockEngine::new();
    let http = MockHttp::answering(200);
    let registry = MachineRegistry::new();

    let err = start(
        &engine,
        &http,
        &registry,
        &CancellationToken::new(),
        &declared(&yaml),
    )
    .await
    .expect_err("unknown agent");

    assert!(matches!(
        err,
        StartError::Validation(ValidationError::UnknownAgent { .. })
    ));
    assert!(engine.started.borrow().is_empty());
    assert!(registry.list().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_start_launches_nothing() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(200);
    let registry = MachineRegistry::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = start(&engine, &http, &registry, &cancel, &declared(WEB_DB))
        .await
        .expect_err("cancelled");

    assert!(matches!(err, StartError::Cancelled));
    assert!(engine.started.borrow().is_empty());
    assert!(registry.list().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_destroys_in_reverse_start_order() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(200);
    let registry = MachineRegistry::new();
    start(
        &engine,
        &http,
        &registry,
        &CancellationToken::new(),
        &declared(WEB_DB),
    )
    .await
    .expect("start");

    let stopped = stop_workspace(&engine, &registry, "ws1").await;

    assert_eq!(stopped.len(), 2);
    assert!(
        stopped
            .iter()
            .all(|entry| entry.state().status == MachineStatus::Stopping)
    );
    assert_eq!(*engine.destroyed.borrow(), ["cid-web", "cid-db"]);
    assert!(registry.list().is_empty());
}
