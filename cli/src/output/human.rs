//! Human-readable terminal renderer.

use std::path::Path;
use std::time::Duration;

use owo_colors::OwoColorize as _;
use workbay_common::AgentDescriptor;

use crate::application::services::workspace_start::StartOutcome;
use crate::domain::agent::LaunchState;
use crate::domain::config::WorkbayConfig;
use crate::domain::environment::PreparedEnvironment;
use crate::domain::machine::MachineStatus;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Summary of a validated environment.
    pub fn render_prepared(&self, prepared: &PreparedEnvironment) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.success("Environment is valid");
        self.ctx.kv("Start order:", &prepared.start_order.join(" → "));
        self.ctx.kv(
            "Dev machine:",
            prepared.dev_machine.as_deref().unwrap_or("(none)"),
        );
        for (name, config) in prepared.model.iter() {
            let image = config.image.as_deref().unwrap_or("(build)");
            let ports = config.expose.iter().cloned().collect::<Vec<_>>().join(", ");
            println!(
                "    {:<16} {:<28} {}",
                name.style(self.ctx.styles.bold),
                image,
                ports.style(self.ctx.styles.dim)
            );
        }
    }

    /// Table of effective agent descriptors.
    pub fn render_agents(&self, agents: &[AgentDescriptor]) {
        if agents.is_empty() {
            self.ctx.info("No agents configured.");
            return;
        }
        println!(
            "  {:<22} {:<16} {:>10} {:>8}  {}",
            "ID".style(self.ctx.styles.header),
            "NAME".style(self.ctx.styles.header),
            "MAX WAIT".style(self.ctx.styles.header),
            "POLL".style(self.ctx.styles.header),
            "MACHINE TYPES".style(self.ctx.styles.header),
        );
        for agent in agents {
            let types = if agent.machine_types.is_empty() {
                "any".to_string()
            } else {
                agent.machine_types.join(", ")
            };
            println!(
                "  {:<22} {:<16} {:>10} {:>8}  {}",
                agent.id,
                agent.display_name(),
                format_duration(Duration::from_millis(agent.max_start_time_ms)),
                format_duration(Duration::from_millis(agent.poll_interval_ms)),
                types
            );
        }
    }

    /// Machines and agent launches of a started workspace.
    pub fn render_started(&self, outcome: &StartOutcome) {
        if self.ctx.quiet {
            return;
        }
        let workspace = outcome.workspace();
        println!();
        self.ctx
            .header(&format!("Workspace {}", workspace.workspace_id));
        for instance in &workspace.machines {
            let dev = if instance.state.is_dev { " (dev)" } else { "" };
            self.ctx.kv(
                &format!("{}{dev}:", instance.state.name),
                &format!(
                    "{} {}",
                    machine_status_display(instance.state.status),
                    short_id(&instance.handle.container_id).style(self.ctx.styles.dim)
                ),
            );
        }
        for attempt in &workspace.agents {
            let line = format!(
                "{} on {} {} after {}",
                attempt.agent,
                attempt.machine,
                launch_state_display(attempt.state()),
                format_duration(attempt.elapsed)
            );
            if attempt.state() == LaunchState::Live {
                self.ctx.success(&line);
            } else {
                self.ctx.warn(&line);
            }
        }
        if let StartOutcome::Degraded { failures, .. } = outcome {
            println!();
            self.ctx
                .warn(&format!("Workspace degraded: {} agent(s) failed", failures.len()));
        }
    }

    /// Render the current configuration.
    pub fn render_config(&self, config: &WorkbayConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<32} {}", "engine.machine_type:", config.engine.machine_type);
        println!(
            "  {:<32} {}",
            "engine.command_timeout_secs:", config.engine.command_timeout_secs
        );
        println!(
            "  {:<32} {}",
            "agents.http_probe_timeout_ms:", config.agents.http_probe_timeout_ms
        );
        println!(
            "  {:<32} {}",
            "agents.terminal_run_command:", config.agents.terminal_run_command
        );
        println!(
            "  {:<32} {}",
            "workspace.api_endpoint:",
            config.workspace.api_endpoint.as_deref().unwrap_or("(not set)")
        );
        if !config.agents.overrides.is_empty() {
            println!(
                "  {:<32} {}",
                "agents.overrides:",
                config
                    .agents
                    .overrides
                    .iter()
                    .map(|a| a.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["WORKBAY_CONFIG", "NO_COLOR", "RUST_LOG"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
    }
}

// ── Display helpers ──────────────────────────────────────────────────────────

/// `850ms`, `1.5s`, `2m 05s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        let tenths = ms / 100;
        if tenths % 10 == 0 {
            format!("{}s", tenths / 10)
        } else {
            format!("{}.{}s", tenths / 10, tenths % 10)
        }
    } else {
        let secs = d.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// First 12 characters of a container id, like `docker ps`.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

#[must_use]
pub fn machine_status_display(status: MachineStatus) -> &'static str {
    match status {
        MachineStatus::Starting => "starting",
        MachineStatus::Running => "running",
        MachineStatus::Stopping => "stopping",
        MachineStatus::Failed => "failed",
    }
}

#[must_use]
pub fn launch_state_display(state: LaunchState) -> &'static str {
    match state {
        LaunchState::NotStarted => "not started",
        LaunchState::ScriptRunning => "starting",
        LaunchState::Polling => "polling",
        LaunchState::Live => "live",
        LaunchState::TimedOut => "timed out",
        LaunchState::Failed => "failed",
    }
}
