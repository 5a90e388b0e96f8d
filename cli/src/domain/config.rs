//! Domain types and validators for Workbay configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use serde::{Deserialize, Serialize};
use workbay_common::{AgentDescriptor, agent_ids};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "engine.machine_type",
    "engine.command_timeout_secs",
    "agents.http_probe_timeout_ms",
    "agents.terminal_run_command",
    "workspace.api_endpoint",
];

pub const DEFAULT_MACHINE_TYPE: &str = "docker";
pub const DEFAULT_TERMINAL_RUN_COMMAND: &str =
    "nohup workbay-terminal -addr :4411 -cmd /bin/bash > ~/workbay/terminal/terminal.log 2>&1 &";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.workbay/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkbayConfig {
    pub engine: EngineConfig,
    pub agents: AgentsConfig,
    pub workspace: WorkspaceConfig,
}

/// Container engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Machine type agents are matched against.
    pub machine_type: String,
    /// Upper bound for a single engine command.
    pub command_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            command_timeout_secs: 30,
        }
    }
}

/// Agent launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Per-request bound of one HTTP liveness probe.
    pub http_probe_timeout_ms: u64,
    /// Appended to the terminal agent's script.
    pub terminal_run_command: String,
    /// Replace built-in descriptors by id, or add new agents.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<AgentDescriptor>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            http_probe_timeout_ms: 2000,
            terminal_run_command: DEFAULT_TERMINAL_RUN_COMMAND.to_string(),
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Exposed to machines as `WORKBAY_API_ENDPOINT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl WorkbayConfig {
    /// Built-in agents with overrides applied. Overrides replace built-ins
    /// of the same id in place; new ids are appended.
    #[must_use]
    pub fn effective_agents(&self) -> Vec<AgentDescriptor> {
        let mut agents = builtin_agents();
        for custom in &self.agents.overrides {
            match agents.iter_mut().find(|a| a.id == custom.id) {
                Some(slot) => *slot = custom.clone(),
                None => agents.push(custom.clone()),
            }
        }
        agents
    }
}

/// Descriptors shipped with the platform.
#[must_use]
pub fn builtin_agents() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor {
            id: agent_ids::WS_AGENT.to_string(),
            name: Some("Workspace API".to_string()),
            script: "mkdir -p ~/workbay/ws-agent && cd ~/workbay/ws-agent && \
                     nohup ./bin/ws-agent --port 4401 > ws-agent.log 2>&1 &"
                .to_string(),
            machine_types: Vec::new(),
            max_start_time_ms: 120_000,
            poll_interval_ms: 1000,
            liveness: None,
        },
        AgentDescriptor {
            id: agent_ids::TERMINAL.to_string(),
            name: Some("Terminal".to_string()),
            script: "mkdir -p ~/workbay/terminal".to_string(),
            machine_types: Vec::new(),
            max_start_time_ms: 30_000,
            poll_interval_ms: 500,
            liveness: None,
        },
        AgentDescriptor {
            id: agent_ids::SSH.to_string(),
            name: Some("SSH".to_string()),
            script: "mkdir -p /var/run/sshd && /usr/sbin/sshd".to_string(),
            machine_types: vec![DEFAULT_MACHINE_TYPE.to_string()],
            max_start_time_ms: 20_000,
            poll_interval_ms: 500,
            liveness: None,
        },
    ]
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a loaded configuration, including every effective agent.
///
/// # Errors
///
/// Returns the first offending setting or agent.
pub fn validate_config(config: &WorkbayConfig) -> Result<(), ConfigError> {
    if config.engine.machine_type.trim().is_empty() {
        return Err(invalid("engine.machine_type", "", "must not be empty"));
    }
    if config.agents.http_probe_timeout_ms == 0 {
        return Err(invalid("agents.http_probe_timeout_ms", "0", "must be positive"));
    }
    for agent in config.effective_agents() {
        validate_agent(&agent)?;
    }
    Ok(())
}

/// Checks the timing and script of one descriptor.
///
/// # Errors
///
/// `ConfigError::InvalidAgent` naming the agent and the problem.
pub fn validate_agent(agent: &AgentDescriptor) -> Result<(), ConfigError> {
    let reason = if agent.id.trim().is_empty() {
        Some("id must not be empty".to_string())
    } else if agent.script.trim().is_empty() {
        Some("script must not be empty".to_string())
    } else if agent.poll_interval_ms == 0 {
        Some("pollIntervalMs must be positive".to_string())
    } else if agent.max_start_time_ms < agent.poll_interval_ms {
        Some(format!(
            "maxStartTimeMs ({}) must not be below pollIntervalMs ({})",
            agent.max_start_time_ms, agent.poll_interval_ms
        ))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(ConfigError::InvalidAgent {
            agent: agent.id.clone(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<(), ConfigError> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        });
    }
    Ok(())
}

/// Parses `value` for `key` and stores it in `config`.
///
/// # Errors
///
/// Returns an error for unknown keys and malformed values.
pub fn apply_config_value(
    config: &mut WorkbayConfig,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    validate_config_key(key)?;
    match key {
        "engine.machine_type" => {
            if value.trim().is_empty() {
                return Err(invalid(key, value, "must not be empty"));
            }
            config.engine.machine_type = value.trim().to_string();
        }
        "engine.command_timeout_secs" => {
            config.engine.command_timeout_secs = parse_positive(key, value)?;
        }
        "agents.http_probe_timeout_ms" => {
            config.agents.http_probe_timeout_ms = parse_positive(key, value)?;
        }
        "agents.terminal_run_command" => {
            config.agents.terminal_run_command = value.to_string();
        }
        "workspace.api_endpoint" => {
            config.workspace.api_endpoint = (!value.is_empty()).then(|| value.to_string());
        }
        _ => {}
    }
    Ok(())
}

fn parse_positive(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid(key, value, "expected a positive integer"))
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
