//! Application service — launch one agent inside a running machine.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use workbay_common::{AgentDescriptor, ServerConfig};

use crate::application::ports::{ContainerEngine, HttpProbe};
use crate::application::services::liveness::Prober;
use crate::domain::agent::liveness::{self, ResolveError};
use crate::domain::agent::{AgentKind, AgentLaunchAttempt, LaunchState, LivenessCheck};
use crate::domain::config::AgentsConfig;
use crate::domain::error::LaunchError;
use crate::domain::machine::Instance;

/// Knobs shared by every launch of one workspace start.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub http_probe_timeout: Duration,
    pub terminal_run_command: String,
    /// Public keys the SSH agent authorizes.
    pub ssh_public_keys: Vec<String>,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            http_probe_timeout: Duration::from_millis(2000),
            terminal_run_command: crate::domain::config::DEFAULT_TERMINAL_RUN_COMMAND.to_string(),
            ssh_public_keys: Vec::new(),
        }
    }
}

impl LaunchSettings {
    #[must_use]
    pub fn from_config(config: &AgentsConfig, ssh_public_keys: Vec<String>) -> Self {
        Self {
            http_probe_timeout: Duration::from_millis(config.http_probe_timeout_ms),
            terminal_run_command: config.terminal_run_command.clone(),
            ssh_public_keys,
        }
    }
}

/// Ports and settings a launch runs against.
pub struct LaunchContext<'a, E, H> {
    pub engine: &'a E,
    pub http: &'a H,
    pub settings: &'a LaunchSettings,
    pub cancel: &'a CancellationToken,
}

/// Kind-specific script and check preparation around the shared poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentLauncher {
    kind: AgentKind,
}

impl AgentLauncher {
    #[must_use]
    pub fn for_descriptor(descriptor: &AgentDescriptor) -> Self {
        Self {
            kind: AgentKind::from_id(&descriptor.id),
        }
    }

    #[must_use]
    pub fn kind(self) -> AgentKind {
        self.kind
    }

    /// Script actually dispatched to the machine.
    #[must_use]
    pub fn prepare_script(self, descriptor: &AgentDescriptor, settings: &LaunchSettings) -> String {
        match self.kind {
            AgentKind::Terminal if !settings.terminal_run_command.trim().is_empty() => {
                format!("{}\n{}", descriptor.script, settings.terminal_run_command)
            }
            AgentKind::Ssh if !settings.ssh_public_keys.is_empty() => format!(
                "{}\n{}",
                authorized_keys_script(&settings.ssh_public_keys),
                descriptor.script
            ),
            _ => descriptor.script.clone(),
        }
    }

    /// Descriptor liveness if declared, else the kind default.
    ///
    /// # Errors
    ///
    /// When an HTTP check names a server the machine does not have.
    pub fn liveness_check(
        self,
        descriptor: &AgentDescriptor,
        servers: &IndexMap<String, ServerConfig>,
    ) -> Result<LivenessCheck, ResolveError> {
        match &descriptor.liveness {
            Some(specs) => liveness::resolve(specs, servers),
            None => liveness::resolve(&self.kind.default_liveness(), servers),
        }
    }

    /// Dispatch the agent script and poll until the agent is live.
    ///
    /// The script is not awaited to completion. Between checks the task
    /// sleeps `poll_interval_ms`; cancellation interrupts the sleep.
    ///
    /// # Errors
    ///
    /// `Timeout` once `max_start_time_ms` has elapsed, `MachineGone` when the
    /// container disappears, `Cancelled` on cancellation, `Engine` when the
    /// script cannot be dispatched, `InvalidCheck` for unresolvable checks.
    pub async fn launch<E: ContainerEngine, H: HttpProbe>(
        self,
        ctx: &LaunchContext<'_, E, H>,
        machine: &Instance,
        servers: &IndexMap<String, ServerConfig>,
        descriptor: &AgentDescriptor,
    ) -> Result<AgentLaunchAttempt, LaunchError> {
        let name = machine.state.name.as_str();
        let mut attempt = AgentLaunchAttempt::new(descriptor, name);

        let check = self
            .liveness_check(descriptor, servers)
            .map_err(|e| LaunchError::InvalidCheck {
                agent: descriptor.id.clone(),
                machine: name.to_owned(),
                reason: match e {
                    ResolveError::UnknownServer(s) => format!("unknown server '{s}'"),
                    ResolveError::InvalidPort(p) => format!("invalid port '{p}'"),
                },
            })?;
        if ctx.cancel.is_cancelled() {
            return Err(cancelled(descriptor, name));
        }

        let script = self.prepare_script(descriptor, ctx.settings);
        attempt.advance(LaunchState::ScriptRunning);
        tracing::debug!(agent = %descriptor.id, machine = name, "dispatching agent script");
        ctx.engine
            .exec_detached(&machine.handle, &script)
            .await
            .map_err(|e| LaunchError::Engine {
                agent: descriptor.id.clone(),
                machine: name.to_owned(),
                source: e.into(),
            })?;

        attempt.advance(LaunchState::Polling);
        let prober = Prober {
            engine: ctx.engine,
            http: ctx.http,
            http_timeout: ctx.settings.http_probe_timeout,
        };
        let started = Instant::now();

        loop {
            let outcome = prober.evaluate(&machine.handle, &check).await;
            attempt.record_check(outcome.clone(), started.elapsed());

            if outcome.is_live() {
                attempt.advance(LaunchState::Live);
                tracing::info!(
                    agent = %descriptor.id,
                    machine = name,
                    elapsed_ms = attempt.elapsed.as_millis(),
                    polls = attempt.polls,
                    "agent is live"
                );
                return Ok(attempt);
            }

            match ctx.engine.is_alive(&machine.handle).await {
                Ok(false) => {
                    attempt.advance(LaunchState::Failed);
                    return Err(LaunchError::MachineGone {
                        agent: descriptor.id.clone(),
                        machine: name.to_owned(),
                    });
                }
                Ok(true) => {}
                Err(e) => {
                    tracing::debug!(machine = name, error = %e, "could not inspect machine");
                }
            }

            if attempt.deadline_reached() {
                attempt.advance(LaunchState::TimedOut);
                return Err(LaunchError::Timeout {
                    agent: descriptor.id.clone(),
                    machine: name.to_owned(),
                    elapsed: attempt.elapsed,
                });
            }

            tracing::debug!(
                agent = %descriptor.id,
                machine = name,
                poll = attempt.polls,
                ?outcome,
                "agent not live yet"
            );
            tokio::select! {
                () = ctx.cancel.cancelled() => {
                    attempt.advance(LaunchState::Failed);
                    return Err(cancelled(descriptor, name));
                }
                () = tokio::time::sleep(attempt.poll_interval) => {}
            }
        }
    }
}

fn cancelled(descriptor: &AgentDescriptor, machine: &str) -> LaunchError {
    LaunchError::Cancelled {
        agent: descriptor.id.clone(),
        machine: machine.to_owned(),
    }
}

/// Shell snippet appending `keys` to `~/.ssh/authorized_keys`.
fn authorized_keys_script(keys: &[String]) -> String {
    let quoted: Vec<String> = keys.iter().map(|k| shell_quote(k.trim())).collect();
    format!(
        "mkdir -p ~/.ssh && chmod 700 ~/.ssh && printf '%s\\n' {} >> ~/.ssh/authorized_keys && chmod 600 ~/.ssh/authorized_keys",
        quoted.join(" ")
    )
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
