//! Registry snapshots and lifecycle through the public API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use workbay_cli::application::registry::MachineRegistry;
use workbay_cli::domain::error::RegistryError;
use workbay_cli::domain::machine::{
    InstanceHandle, MachineEntry, MachineState, MachineStatus, RuntimeIdentity,
};

fn identity(ws: &str) -> RuntimeIdentity {
    RuntimeIdentity {
        workspace_id: ws.into(),
        env_name: "default".into(),
        owner: "dev".into(),
    }
}

fn handle(id: &str) -> InstanceHandle {
    InstanceHandle {
        container_id: id.into(),
        machine_type: "docker".into(),
    }
}

#[test]
fn list_shows_live_before_declared() {
    let registry = MachineRegistry::new();
    let db = MachineState::declared(&identity("ws1"), "db", false);
    let web = MachineState::declared(&identity("ws1"), "web", true);
    registry.add_declared(db.clone()).unwrap();
    registry.add_declared(web.clone()).unwrap();
    registry.promote(&web.id, handle("c-web")).unwrap();

    let names: Vec<(String, bool)> = registry
        .list()
        .iter()
        .map(|e| (e.state().name.clone(), e.is_live()))
        .collect();
    assert_eq!(
        names,
        [("web".to_string(), true), ("db".to_string(), false)]
    );
}

#[test]
fn workspace_views_are_isolated() {
    let registry = MachineRegistry::new();
    registry
        .add_declared(MachineState::declared(&identity("ws1"), "dev", true))
        .unwrap();
    registry
        .add_declared(MachineState::declared(&identity("ws2"), "dev", true))
        .unwrap();

    assert_eq!(registry.list_workspace("ws1").len(), 1);
    let removed = registry.remove_workspace("ws2");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].state().workspace_id, "ws2");
    assert_eq!(registry.list().len(), 1);
}

#[test]
fn set_status_updates_live_entries() {
    let registry = MachineRegistry::new();
    let dev = MachineState::declared(&identity("ws1"), "dev", true);
    registry.add_declared(dev.clone()).unwrap();
    registry.promote(&dev.id, handle("c-dev")).unwrap();

    registry.set_status(&dev.id, MachineStatus::Stopping).unwrap();

    let MachineEntry::Live(instance) = registry.get(&dev.id).unwrap() else {
        panic!("expected live entry");
    };
    assert_eq!(instance.state.status, MachineStatus::Stopping);
    assert_eq!(
        registry.set_status("missing", MachineStatus::Failed),
        Err(RegistryError::NotFound("missing".into()))
    );
}

#[test]
fn dev_machine_only_once_live() {
    let registry = MachineRegistry::new();
    let dev = MachineState::declared(&identity("ws1"), "dev", true);
    registry.add_declared(dev.clone()).unwrap();
    assert!(matches!(
        registry.dev_machine("ws1"),
        Err(RegistryError::DevMachineNotFound(_))
    ));

    registry.promote(&dev.id, handle("c-dev")).unwrap();
    assert_eq!(registry.dev_machine("ws1").unwrap().handle.container_id, "c-dev");
}
