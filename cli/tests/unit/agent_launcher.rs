//! Agent launch polling: timing, timeout, cancellation and machine loss.
//!
//! Every timed test runs on a paused tokio clock, so elapsed values are exact.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use indexmap::IndexMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use workbay_cli::application::services::agent_launch::{
    AgentLauncher, LaunchContext, LaunchSettings,
};
use workbay_cli::domain::agent::LaunchState;
use workbay_cli::domain::error::LaunchError;
use workbay_cli::domain::machine::{Instance, InstanceHandle, MachineState, RuntimeIdentity};
use workbay_common::{AgentDescriptor, ServerConfig, agent_ids};

use crate::mocks::{MockEngine, MockHttp, millis, process_agent};

fn instance(name: &str) -> Instance {
    let identity = RuntimeIdentity {
        workspace_id: "ws1".into(),
        env_name: "default".into(),
        owner: "dev".into(),
    };
    Instance {
        state: MachineState::declared(&identity, name, true),
        handle: InstanceHandle {
            container_id: format!("cid-{name}"),
            machine_type: "docker".into(),
        },
    }
}

fn no_servers() -> IndexMap<String, ServerConfig> {
    IndexMap::new()
}

async fn launch(
    engine: &MockEngine,
    http: &MockHttp,
    cancel: &CancellationToken,
    servers: &IndexMap<String, ServerConfig>,
    descriptor: &AgentDescriptor,
) -> Result<workbay_cli::domain::agent::AgentLaunchAttempt, LaunchError> {
    let settings = LaunchSettings::default();
    let ctx = LaunchContext {
        engine,
        http,
        settings: &settings,
        cancel,
    };
    AgentLauncher::for_descriptor(descriptor)
        .launch(&ctx, &instance("dev"), servers, descriptor)
        .await
}

#[tokio::test(start_paused = true)]
async fn live_on_third_check_reports_two_poll_intervals() {
    let engine = MockEngine::new().live_after("agentd", 3);
    let http = MockHttp::answering(200);
    let agent = process_agent("acme.agent", "agentd", 10, 1000);

    let attempt = launch(&engine, &http, &CancellationToken::new(), &no_servers(), &agent)
        .await
        .expect("agent goes live");

    assert_eq!(attempt.state(), LaunchState::Live);
    assert_eq!(attempt.polls, 3);
    assert_eq!(attempt.elapsed, millis(20));
    assert_eq!(engine.scripts.borrow().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn never_live_times_out_at_max_start_time() {
    let engine = MockEngine::new().never_live("agentd");
    let http = MockHttp::answering(200);
    let agent = process_agent("acme.agent", "agentd", 10, 50);

    let err = launch(&engine, &http, &CancellationToken::new(), &no_servers(), &agent)
        .await
        .expect_err("should time out");

    let LaunchError::Timeout { elapsed, agent, .. } = err else {
        panic!("expected timeout, got {err:?}");
    };
    assert_eq!(agent, "acme.agent");
    assert!(elapsed >= millis(50), "elapsed {elapsed:?}");
    assert!(elapsed < millis(100), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_poll_sleep() {
    let engine = MockEngine::new().never_live("agentd");
    let http = MockHttp::answering(200);
    let agent = process_agent("acme.agent", "agentd", 1000, 60_000);
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let servers = no_servers();
    let (result, ()) = tokio::join!(launch(&engine, &http, &cancel, &servers, &agent), async {
        tokio::time::sleep(millis(1500)).await;
        cancel.cancel();
    });

    assert!(matches!(result, Err(LaunchError::Cancelled { .. })));
    assert_eq!(started.elapsed(), millis(1500));
    assert_eq!(engine.checks_of("agentd"), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_dispatch_runs_no_script() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(200);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let agent = process_agent("acme.agent", "agentd", 10, 100);

    let err = launch(&engine, &http, &cancel, &no_servers(), &agent)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, LaunchError::Cancelled { .. }));
    assert!(engine.scripts.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn vanished_machine_fails_fast() {
    let engine = MockEngine::new().never_live("agentd");
    engine.gone.set(true);
    let http = MockHttp::answering(200);
    let agent = process_agent("acme.agent", "agentd", 10, 60_000);

    let err = launch(&engine, &http, &CancellationToken::new(), &no_servers(), &agent)
        .await
        .expect_err("machine gone");

    assert!(matches!(err, LaunchError::MachineGone { .. }), "got {err:?}");
    assert_eq!(engine.checks_of("agentd"), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_script_is_an_engine_error() {
    let engine = MockEngine::new().failing_exec();
    let http = MockHttp::answering(200);
    let agent = process_agent("acme.agent", "agentd", 10, 100);

    let err = launch(&engine, &http, &CancellationToken::new(), &no_servers(), &agent)
        .await
        .expect_err("exec refused");

    assert!(matches!(err, LaunchError::Engine { .. }));
    assert_eq!(engine.checks_of("agentd"), 0);
}

#[tokio::test(start_paused = true)]
async fn ws_agent_pings_its_server_until_healthy() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(200).then(&[503, 502]);
    let mut servers = IndexMap::new();
    servers.insert(
        "wsagent".to_string(),
        ServerConfig {
            port: "4401/tcp".into(),
            protocol: Some("http".into()),
            path: Some("/api".into()),
            ..ServerConfig::default()
        },
    );
    let agent = AgentDescriptor {
        id: agent_ids::WS_AGENT.into(),
        name: None,
        script: "start-ws-agent".into(),
        machine_types: Vec::new(),
        max_start_time_ms: 10_000,
        poll_interval_ms: 100,
        liveness: None,
    };

    let attempt = launch(&engine, &http, &CancellationToken::new(), &servers, &agent)
        .await
        .expect("live");

    assert_eq!(attempt.polls, 3);
    assert_eq!(attempt.elapsed, millis(200));
    assert_eq!(http.urls.borrow()[0], "http://127.0.0.1:4401/api");
}

#[tokio::test(start_paused = true)]
async fn ws_agent_connection_error_is_retried() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(200).then_refused();
    let mut servers = IndexMap::new();
    servers.insert(
        "wsagent".to_string(),
        ServerConfig {
            port: "4401/tcp".into(),
            protocol: Some("http".into()),
            path: Some("/api".into()),
            ..ServerConfig::default()
        },
    );
    let agent = AgentDescriptor {
        id: agent_ids::WS_AGENT.into(),
        name: None,
        script: "start-ws-agent".into(),
        machine_types: Vec::new(),
        max_start_time_ms: 10_000,
        poll_interval_ms: 100,
        liveness: None,
    };

    let attempt = launch(&engine, &http, &CancellationToken::new(), &servers, &agent)
        .await
        .expect("live after the refused ping");

    assert_eq!(attempt.polls, 2);
    assert_eq!(attempt.elapsed, millis(100));
    assert_eq!(http.urls.borrow().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn ws_agent_without_server_is_an_invalid_check() {
    let engine = MockEngine::new();
    let http = MockHttp::answering(200);
    let agent = AgentDescriptor {
        id: agent_ids::WS_AGENT.into(),
        name: None,
        script: "start".into(),
        machine_types: Vec::new(),
        max_start_time_ms: 1000,
        poll_interval_ms: 100,
        liveness: None,
    };

    let err = launch(&engine, &http, &CancellationToken::new(), &no_servers(), &agent)
        .await
        .expect_err("no server");

    assert!(matches!(err, LaunchError::InvalidCheck { .. }));
    assert!(engine.scripts.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn terminal_needs_process_and_port_together() {
    // Process is up immediately, the port only on the third check.
    let engine = MockEngine::new().live_after("4411/tcp", 3);
    let http = MockHttp::answering(200);
    let agent = AgentDescriptor {
        id: agent_ids::TERMINAL.into(),
        name: None,
        script: "mkdir -p ~/workbay/terminal".into(),
        machine_types: Vec::new(),
        max_start_time_ms: 5000,
        poll_interval_ms: 50,
        liveness: None,
    };

    let attempt = launch(&engine, &http, &CancellationToken::new(), &no_servers(), &agent)
        .await
        .expect("live");

    assert_eq!(attempt.polls, 3);
    assert_eq!(engine.checks_of("workbay-terminal"), 3);
    let scripts = engine.scripts.borrow();
    assert!(scripts[0].1.starts_with("mkdir -p ~/workbay/terminal\n"));
    assert!(scripts[0].1.contains("workbay-terminal"));
}
