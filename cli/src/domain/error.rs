//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use thiserror::Error;

/// Boxed error from an external collaborator (container engine, HTTP probe).
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ── Environment errors ────────────────────────────────────────────────────────

/// Malformed or unsupported declared environment. Never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{converter} converter cannot handle environment of type '{actual}'")]
    TypeMismatch {
        converter: &'static str,
        actual: &'static str,
    },

    #[error(
        "{kind} environment must declare exactly one machine, found {count}: [{names}]"
    )]
    MachineCount {
        kind: &'static str,
        count: usize,
        names: String,
    },

    #[error("environment declares no machines")]
    NoMachines,

    #[error("machine '{machine}' has no image and no build source")]
    MissingBuildSource { machine: String },

    #[error("machine '{0}' is declared but not present in the recipe")]
    UnknownMachine(String),

    #[error("machine '{machine}' {field} references unknown machine '{target}'")]
    UnknownReference {
        machine: String,
        field: &'static str,
        target: String,
    },

    #[error("invalid machine name '{0}': must match ^[a-zA-Z0-9][a-zA-Z0-9_.-]*$")]
    InvalidMachineName(String),

    #[error("value '{value}' of attribute '{attribute}' of machine '{machine}' is illegal")]
    IllegalAttribute {
        machine: String,
        attribute: String,
        value: String,
    },

    #[error("server '{server}' of machine '{machine}' has invalid port '{port}'")]
    InvalidServerPort {
        machine: String,
        server: String,
        port: String,
    },

    #[error("environment must contain exactly one machine with agent '{agent}', found: [{machines}]")]
    DevMachine { agent: &'static str, machines: String },

    #[error("dependency cycle between machines: [{0}]")]
    DependencyCycle(String),

    #[error("machine '{machine}' requests unknown agent '{agent}'")]
    UnknownAgent { machine: String, agent: String },
}

// ── Registry errors ───────────────────────────────────────────────────────────

/// Errors from the machine registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("machine '{0}' is already registered")]
    Conflict(String),

    #[error("machine '{0}' not found")]
    NotFound(String),

    #[error("workspace '{0}' has no running dev machine")]
    DevMachineNotFound(String),
}

// ── Agent launch errors ───────────────────────────────────────────────────────

/// Terminal failures of one agent launch attempt.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(
        "agent '{agent}' on machine '{machine}' did not become live within {}ms",
        .elapsed.as_millis()
    )]
    Timeout {
        agent: String,
        machine: String,
        elapsed: Duration,
    },

    #[error("machine '{machine}' disappeared while agent '{agent}' was starting")]
    MachineGone { agent: String, machine: String },

    #[error("launch of agent '{agent}' on machine '{machine}' was cancelled")]
    Cancelled { agent: String, machine: String },

    #[error("agent '{agent}' on machine '{machine}' has an unusable liveness check: {reason}")]
    InvalidCheck {
        agent: String,
        machine: String,
        reason: String,
    },

    #[error("engine failed while launching agent '{agent}' on machine '{machine}'")]
    Engine {
        agent: String,
        machine: String,
        #[source]
        source: EngineError,
    },
}

impl LaunchError {
    /// Id of the agent the failed attempt belonged to.
    #[must_use]
    pub fn agent(&self) -> &str {
        match self {
            LaunchError::Timeout { agent, .. }
            | LaunchError::MachineGone { agent, .. }
            | LaunchError::Cancelled { agent, .. }
            | LaunchError::InvalidCheck { agent, .. }
            | LaunchError::Engine { agent, .. } => agent,
        }
    }

    /// Name of the machine the agent was launched on.
    #[must_use]
    pub fn machine(&self) -> &str {
        match self {
            LaunchError::Timeout { machine, .. }
            | LaunchError::MachineGone { machine, .. }
            | LaunchError::Cancelled { machine, .. }
            | LaunchError::InvalidCheck { machine, .. }
            | LaunchError::Engine { machine, .. } => machine,
        }
    }
}

// ── Workspace start errors ────────────────────────────────────────────────────

/// Why a workspace start did not reach `Running` or `Degraded`.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid environment: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to start machine '{machine}'")]
    Engine {
        machine: String,
        #[source]
        source: EngineError,
    },

    #[error("workspace start failed: {0}")]
    Agent(#[source] LaunchError),

    #[error("workspace start was cancelled")]
    Cancelled,
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown setting: {key}. Valid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("agent '{agent}': {reason}")]
    InvalidAgent { agent: String, reason: String },
}
