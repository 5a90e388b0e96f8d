//! Shared in-memory registry of declared and live machines.
//!
//! One lock guards both maps so a machine id is never observable in both,
//! and a promotion is atomic with respect to concurrent `get`/`list`.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::domain::error::RegistryError;
use crate::domain::machine::{Instance, InstanceHandle, MachineEntry, MachineState, MachineStatus};

#[derive(Debug, Default)]
struct Machines {
    declared: IndexMap<String, MachineState>,
    live: IndexMap<String, Instance>,
}

/// Internally synchronized; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    inner: RwLock<Machines>,
}

impl MachineRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Machines> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Machines> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// # Errors
    ///
    /// `Conflict` if the id is already declared or live.
    pub fn add_declared(&self, state: MachineState) -> Result<(), RegistryError> {
        let mut m = self.write();
        if m.declared.contains_key(&state.id) || m.live.contains_key(&state.id) {
            return Err(RegistryError::Conflict(state.id));
        }
        m.declared.insert(state.id.clone(), state);
        Ok(())
    }

    /// Register a live instance. A declared entry with the same id is
    /// dropped in the same critical section.
    ///
    /// # Errors
    ///
    /// `Conflict` if the id is already live.
    pub fn add_live(&self, instance: Instance) -> Result<(), RegistryError> {
        let mut m = self.write();
        let id = instance.id().to_owned();
        if m.live.contains_key(&id) {
            return Err(RegistryError::Conflict(id));
        }
        m.declared.shift_remove(&id);
        m.live.insert(id, instance);
        Ok(())
    }

    /// Move a declared machine to live, bound to `handle`, in `Running` status.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is not declared.
    pub fn promote(&self, id: &str, handle: InstanceHandle) -> Result<Instance, RegistryError> {
        let mut m = self.write();
        let mut state = m
            .declared
            .shift_remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_owned()))?;
        state.status = MachineStatus::Running;
        let instance = Instance { state, handle };
        m.live.insert(id.to_owned(), instance.clone());
        Ok(instance)
    }

    /// Live instance if present, else a snapshot of the declared state.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn get(&self, id: &str) -> Result<MachineEntry, RegistryError> {
        let m = self.read();
        if let Some(instance) = m.live.get(id) {
            return Ok(MachineEntry::Live(instance.clone()));
        }
        m.declared
            .get(id)
            .map(|state| MachineEntry::Declared(state.clone()))
            .ok_or_else(|| RegistryError::NotFound(id.to_owned()))
    }

    /// Owned snapshot: live machines first, then declared ones, each in
    /// registration order.
    #[must_use]
    pub fn list(&self) -> Vec<MachineEntry> {
        let m = self.read();
        m.live
            .values()
            .cloned()
            .map(MachineEntry::Live)
            .chain(m.declared.values().cloned().map(MachineEntry::Declared))
            .collect()
    }

    /// Snapshot restricted to one workspace.
    #[must_use]
    pub fn list_workspace(&self, workspace_id: &str) -> Vec<MachineEntry> {
        self.list()
            .into_iter()
            .filter(|e| e.state().workspace_id == workspace_id)
            .collect()
    }

    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn remove(&self, id: &str) -> Result<MachineEntry, RegistryError> {
        let mut m = self.write();
        if let Some(instance) = m.live.shift_remove(id) {
            return Ok(MachineEntry::Live(instance));
        }
        m.declared
            .shift_remove(id)
            .map(MachineEntry::Declared)
            .ok_or_else(|| RegistryError::NotFound(id.to_owned()))
    }

    /// Drop every entry of a workspace and return what was removed.
    pub fn remove_workspace(&self, workspace_id: &str) -> Vec<MachineEntry> {
        let mut m = self.write();
        let mut removed = Vec::new();
        m.live.retain(|_, instance| {
            if instance.state.workspace_id == workspace_id {
                removed.push(MachineEntry::Live(instance.clone()));
                false
            } else {
                true
            }
        });
        m.declared.retain(|_, state| {
            if state.workspace_id == workspace_id {
                removed.push(MachineEntry::Declared(state.clone()));
                false
            } else {
                true
            }
        });
        removed
    }

    /// The live dev machine of a workspace.
    ///
    /// # Errors
    ///
    /// `DevMachineNotFound` when the workspace has no live dev machine.
    pub fn dev_machine(&self, workspace_id: &str) -> Result<Instance, RegistryError> {
        self.read()
            .live
            .values()
            .find(|i| i.state.is_dev && i.state.workspace_id == workspace_id)
            .cloned()
            .ok_or_else(|| RegistryError::DevMachineNotFound(workspace_id.to_owned()))
    }

    /// # Errors
    ///
    /// `NotFound` if the id is unknown.
    pub fn set_status(&self, id: &str, status: MachineStatus) -> Result<(), RegistryError> {
        let mut m = self.write();
        if let Some(instance) = m.live.get_mut(id) {
            instance.state.status = status;
            return Ok(());
        }
        let state = m
            .declared
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_owned()))?;
        state.status = status;
        Ok(())
    }
}
