//! `workbay up` — start an environment and supervise it until interrupted.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::app::AppContext;
use crate::application::ports::ContainerEngine;
use crate::application::registry::MachineRegistry;
use crate::application::services::agent_launch::LaunchSettings;
use crate::application::services::workspace_start::{StartOutcome, StartRequest, start_workspace};
use crate::application::services::workspace_stop::stop_workspace;
use crate::domain::environment::env_vars;
use crate::domain::machine::Instance;
use crate::output::progress;
use crate::output::reporter::TerminalReporter;

/// How often a supervised workspace is checked for vanished machines.
const SUPERVISE_INTERVAL: Duration = Duration::from_secs(5);

/// Public keys tried when no `--ssh-key` is given.
const DEFAULT_SSH_KEYS: &[&str] = &["id_ed25519.pub", "id_ecdsa.pub", "id_rsa.pub"];

#[derive(Args, Debug)]
pub struct UpArgs {
    #[command(flatten)]
    pub env: crate::commands::EnvironmentArgs,

    /// Public key file authorized by the SSH agent (repeatable)
    #[arg(long = "ssh-key", value_name = "PATH")]
    pub ssh_keys: Vec<PathBuf>,

    /// Leave machines running and exit once agents are live
    #[arg(long, short = 'd')]
    pub detach: bool,
}

/// Run the up command.
///
/// # Errors
///
/// Returns an error if the environment is invalid or the workspace fails to
/// start.
pub async fn run(app: &AppContext, args: &UpArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let declared = args.env.load()?;
    let agents = config.effective_agents();
    let providers = env_vars::default_providers(config.workspace.api_endpoint.clone());
    let settings = LaunchSettings::from_config(&config.agents, read_ssh_keys(&args.ssh_keys)?);

    let engine = app.engine(&config);
    let http = app.http_probe(&config);
    let registry = MachineRegistry::new();
    let cancel = CancellationToken::new();
    watch_ctrl_c(cancel.clone());

    let reporter = TerminalReporter::new(&app.output)
        .with_spinner(progress::spinner_if(app.output.show_progress(), "starting workspace"));
    let result = start_workspace(
        &engine,
        &http,
        &registry,
        &reporter,
        &cancel,
        StartRequest {
            declared: &declared,
            identity: args.env.identity(),
            agents: &agents,
            providers: &providers,
            settings: &settings,
        },
    )
    .await;
    reporter.finish();
    let outcome = result?;

    if app.is_json() {
        app.output.print_json(&started_json(&outcome))?;
    } else {
        app.renderer().render_started(&outcome);
    }
    let code = match outcome {
        StartOutcome::Running(_) => ExitCode::SUCCESS,
        StartOutcome::Degraded { .. } => ExitCode::from(2),
    };
    if args.detach {
        return Ok(code);
    }

    app.output.info("Press Ctrl-C to stop the workspace.");
    supervise(&engine, &outcome.workspace().machines, &cancel).await;

    let stopped = stop_workspace(&engine, &registry, &args.env.workspace).await;
    app.output
        .success(&format!("Stopped {} machine(s)", stopped.len()));
    Ok(code)
}

fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

/// Wait for cancellation or for the dev machine to disappear.
async fn supervise<E: ContainerEngine>(
    engine: &E,
    machines: &[Instance],
    cancel: &CancellationToken,
) {
    let Some(dev) = machines.iter().find(|m| m.state.is_dev).or(machines.first()) else {
        return;
    };
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(SUPERVISE_INTERVAL) => {}
        }
        match engine.is_alive(&dev.handle).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(machine = %dev.state.name, "machine exited, stopping workspace");
                return;
            }
            Err(e) => tracing::debug!(error = %e, "liveness check of machine failed"),
        }
    }
}

fn read_ssh_keys(paths: &[PathBuf]) -> Result<Vec<String>> {
    if paths.is_empty() {
        let Some(ssh_dir) = dirs::home_dir().map(|h| h.join(".ssh")) else {
            return Ok(Vec::new());
        };
        return Ok(DEFAULT_SSH_KEYS
            .iter()
            .filter_map(|name| std::fs::read_to_string(ssh_dir.join(name)).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .collect());
    }
    paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .map(|key| key.trim().to_string())
                .with_context(|| format!("cannot read SSH key {}", path.display()))
        })
        .collect()
}

fn started_json(outcome: &StartOutcome) -> serde_json::Value {
    let workspace = outcome.workspace();
    let status = match outcome {
        StartOutcome::Running(_) => "running",
        StartOutcome::Degraded { .. } => "degraded",
    };
    let failures: Vec<String> = match outcome {
        StartOutcome::Running(_) => Vec::new(),
        StartOutcome::Degraded { failures, .. } => {
            failures.iter().map(ToString::to_string).collect()
        }
    };
    serde_json::json!({
        "workspace": workspace.workspace_id,
        "status": status,
        "machines": workspace.machines,
        "agents": workspace.agents.iter().map(|a| serde_json::json!({
            "agent": a.agent,
            "machine": a.machine,
            "state": a.state(),
            "polls": a.polls,
            "elapsed_ms": a.elapsed.as_millis(),
        })).collect::<Vec<_>>(),
        "failures": failures,
    })
}
