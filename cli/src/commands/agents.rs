//! `workbay agents` — inspect agent descriptors.

use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Subcommand;

use crate::app::AppContext;
use crate::domain::agent::AgentKind;
use crate::output::human::format_duration;

/// Agents subcommands.
#[derive(Subcommand)]
pub enum AgentsCommand {
    /// List built-in and configured agents
    List,
    /// Show one agent's script and liveness check
    Info {
        /// Agent id, e.g. workbay.ssh
        id: String,
    },
}

/// Run the agents command.
///
/// # Errors
///
/// Returns an error if the config is invalid or the agent is unknown.
pub fn run(app: &AppContext, cmd: AgentsCommand) -> Result<ExitCode> {
    let agents = app.config()?.effective_agents();
    match cmd {
        AgentsCommand::List => {
            if app.is_json() {
                app.output.print_json(&agents)?;
            } else {
                app.renderer().render_agents(&agents);
            }
        }
        AgentsCommand::Info { id } => {
            let Some(agent) = agents.iter().find(|a| a.id == id) else {
                bail!("unknown agent '{id}'");
            };
            if app.is_json() {
                app.output.print_json(agent)?;
                return Ok(ExitCode::SUCCESS);
            }
            let kind = AgentKind::from_id(&agent.id);
            app.output.header(agent.display_name());
            app.output.kv("Id:", &agent.id);
            app.output.kv(
                "Max start time:",
                &format_duration(std::time::Duration::from_millis(agent.max_start_time_ms)),
            );
            app.output.kv(
                "Poll interval:",
                &format_duration(std::time::Duration::from_millis(agent.poll_interval_ms)),
            );
            let check = match &agent.liveness {
                Some(specs) => serde_json::to_string(specs)?,
                None => serde_json::to_string(&kind.default_liveness())?,
            };
            app.output.kv("Liveness:", &check);
            if let Some((name, server)) = kind.default_server() {
                let protocol = server.protocol.as_deref().unwrap_or("tcp");
                app.output
                    .kv("Server:", &format!("{name} {} ({protocol})", server.port));
            }
            app.output.kv("Script:", &agent.script);
        }
    }
    Ok(ExitCode::SUCCESS)
}
