//! Machine identity and state types.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifies one runtime of a workspace environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RuntimeIdentity {
    pub workspace_id: String,
    pub env_name: String,
    pub owner: String,
}

/// Lifecycle status of a machine as tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineStatus {
    Starting,
    Running,
    Stopping,
    Failed,
}

/// Opaque handle the container engine returns for a started container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceHandle {
    /// Engine-side container id.
    pub container_id: String,
    /// Engine machine type, e.g. `"docker"`.
    pub machine_type: String,
}

/// Metadata of a machine known to the platform but not necessarily running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineState {
    pub id: String,
    pub name: String,
    pub workspace_id: String,
    pub env_name: String,
    pub is_dev: bool,
    pub status: MachineStatus,
    pub created_at: DateTime<Utc>,
}

impl MachineState {
    /// New declared machine in `Starting` status.
    #[must_use]
    pub fn declared(identity: &RuntimeIdentity, name: &str, is_dev: bool) -> Self {
        Self {
            id: generate_machine_id(),
            name: name.to_owned(),
            workspace_id: identity.workspace_id.clone(),
            env_name: identity.env_name.clone(),
            is_dev,
            status: MachineStatus::Starting,
            created_at: Utc::now(),
        }
    }
}

/// A machine bound to a live engine container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub state: MachineState,
    pub handle: InstanceHandle,
}

impl Instance {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.state.id
    }
}

/// Registry view of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MachineEntry {
    Declared(MachineState),
    Live(Instance),
}

impl MachineEntry {
    /// Machine metadata regardless of variant.
    #[must_use]
    pub fn state(&self) -> &MachineState {
        match self {
            MachineEntry::Declared(state) => state,
            MachineEntry::Live(instance) => &instance.state,
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, MachineEntry::Live(_))
    }
}

/// Generate a unique machine identifier.
///
/// Format: `machine` followed by 16 lowercase hex characters.
/// Entropy sources: nanosecond timestamp and two independent `RandomState` hashes.
#[must_use]
pub fn generate_machine_id() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("machine{:016x}", hasher.finish())
}
