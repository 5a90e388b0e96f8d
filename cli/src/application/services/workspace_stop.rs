//! Application service — workspace stop use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use crate::application::ports::ContainerEngine;
use crate::application::registry::MachineRegistry;
use crate::domain::machine::{Instance, MachineEntry, MachineStatus};

/// Mark every machine of the workspace `Stopping`, remove them from the
/// registry and destroy the live containers. Destroy failures are logged,
/// never returned.
pub async fn stop_workspace<E: ContainerEngine>(
    engine: &E,
    registry: &MachineRegistry,
    workspace_id: &str,
) -> Vec<MachineEntry> {
    for entry in registry.list_workspace(workspace_id) {
        let id = &entry.state().id;
        if let Err(e) = registry.set_status(id, MachineStatus::Stopping) {
            tracing::debug!(machine = %id, error = %e, "machine left the registry before stop");
        }
    }
    let removed = registry.remove_workspace(workspace_id);
    destroy_live(engine, &removed).await;
    tracing::info!(workspace = workspace_id, machines = removed.len(), "workspace stopped");
    removed
}

/// Release the given machine ids only; used to roll back a failed start
/// without touching other runtimes of the same workspace.
pub(crate) async fn release<E: ContainerEngine>(
    engine: &E,
    registry: &MachineRegistry,
    ids: &[String],
) {
    let removed: Vec<MachineEntry> = ids.iter().filter_map(|id| registry.remove(id).ok()).collect();
    destroy_live(engine, &removed).await;
}

async fn destroy_live<E: ContainerEngine>(engine: &E, entries: &[MachineEntry]) {
    // Reverse start order: dependants go first.
    for entry in entries.iter().rev() {
        if let MachineEntry::Live(Instance { state, handle }) = entry {
            if let Err(e) = engine.destroy_container(handle).await {
                tracing::warn!(
                    machine = %state.name,
                    container = %handle.container_id,
                    error = %e,
                    "failed to destroy container"
                );
            }
        }
    }
}
