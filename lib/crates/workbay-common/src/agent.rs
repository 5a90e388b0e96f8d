// lib/crates/workbay-common/src/agent.rs

use serde::{Deserialize, Serialize};

/// Stable identifiers of the agents the platform ships.
pub mod agent_ids {
    /// Workspace agent; the machine carrying it is the dev machine.
    pub const WS_AGENT: &str = "workbay.ws-agent";
    /// Websocket terminal.
    pub const TERMINAL: &str = "workbay.terminal";
    /// SSH daemon.
    pub const SSH: &str = "workbay.ssh";
}

/// An in-container daemon the platform injects into a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bootstrap shell script executed inside the machine.
    pub script: String,
    /// Machine types this agent supports. Empty means any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_types: Vec<String>,
    pub max_start_time_ms: u64,
    pub poll_interval_ms: u64,
    /// Overrides the launcher's default liveness check. Several entries must
    /// all pass at the same poll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness: Option<Vec<LivenessSpec>>,
}

impl AgentDescriptor {
    /// Returns `true` if the agent may run on a machine of `machine_type`.
    #[must_use]
    pub fn supports(&self, machine_type: &str) -> bool {
        self.machine_types.is_empty() || self.machine_types.iter().any(|t| t == machine_type)
    }

    /// Human-facing name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Declarative liveness condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LivenessSpec {
    /// A process whose command line contains `name` is running.
    Process { name: String },
    /// The container port accepts connections.
    Port { port: String },
    /// An HTTP GET against the named server answers 2xx/3xx.
    Http {
        server: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}
