//! Servers pass: declared servers → labels, exposed and published ports.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use workbay_common::{DeclaredEnvironment, MachineConfig, ServerConfig};

use super::model::EnvironmentModel;
use crate::domain::agent::AgentKind;
use crate::domain::error::ValidationError;

/// Prefix of every server label written onto a container.
pub const SERVER_LABEL_PREFIX: &str = "workbay.server.";

const REF: &str = "ref";
const PROTOCOL: &str = "protocol";
const PATH: &str = "path";
const INTERNAL: &str = "internal";

/// Apply every machine's declared servers to the model.
///
/// # Errors
///
/// `UnknownMachine` when servers are declared for a machine the model does
/// not contain, `InvalidServerPort` when a port is not `1..=65535[/proto]`.
pub fn provision(
    declared: &DeclaredEnvironment,
    mut model: EnvironmentModel,
) -> Result<EnvironmentModel, ValidationError> {
    for (machine, config) in &declared.machines {
        let servers = effective_servers(config);
        if servers.is_empty() {
            continue;
        }
        let container = model
            .get_mut(machine)
            .ok_or_else(|| ValidationError::UnknownMachine(machine.clone()))?;

        for (reference, server) in &servers {
            let port = normalize_port(&server.port).ok_or_else(|| {
                ValidationError::InvalidServerPort {
                    machine: machine.clone(),
                    server: reference.clone(),
                    port: server.port.clone(),
                }
            })?;

            container.labels.extend(server_labels(reference, &port, server));
            if !contains_port(&container.expose, &port) {
                container.expose.insert(port.clone());
            }
            if !server.is_internal() && !contains_port(&container.ports, &port) {
                container.ports.insert(port);
            }
        }
    }
    Ok(model)
}

/// Declared servers plus the default server of every declared agent whose
/// ref the machine does not already declare.
#[must_use]
pub fn effective_servers(config: &MachineConfig) -> IndexMap<String, ServerConfig> {
    let mut servers = config.servers.clone();
    for agent in &config.agents {
        if let Some((reference, server)) = AgentKind::from_id(agent).default_server() {
            servers.entry(reference.to_owned()).or_insert(server);
        }
    }
    servers
}

/// `"8080"` → `"8080/tcp"`; `"53/UDP"` → `"53/udp"`. `None` if the number is
/// not a valid port.
#[must_use]
pub fn normalize_port(port: &str) -> Option<String> {
    let (number, proto) = match port.trim().split_once('/') {
        Some((number, proto)) => (number, proto.to_ascii_lowercase()),
        None => (port.trim(), "tcp".to_owned()),
    };
    let number: u16 = number.parse().ok().filter(|n| *n != 0)?;
    if proto.is_empty() {
        return None;
    }
    Some(format!("{number}/{proto}"))
}

/// Whether `ports` already holds `port` in any spelling (`8080`, `8080/TCP`).
fn contains_port(ports: &BTreeSet<String>, port: &str) -> bool {
    ports
        .iter()
        .any(|p| normalize_port(p).as_deref() == Some(port))
}

fn server_labels(reference: &str, port: &str, server: &ServerConfig) -> BTreeMap<String, String> {
    let key = |suffix: &str| format!("{SERVER_LABEL_PREFIX}{port}.{suffix}");

    let mut labels = BTreeMap::new();
    labels.insert(key(REF), reference.to_owned());
    if let Some(protocol) = &server.protocol {
        labels.insert(key(PROTOCOL), protocol.clone());
    }
    if let Some(path) = &server.path {
        labels.insert(key(PATH), path.clone());
    }
    if server.is_internal() {
        labels.insert(key(INTERNAL), "true".to_owned());
    }
    labels
}

/// Decode server labels back into `ref -> ServerConfig`.
///
/// Labels without a `.ref` entry are keyed by their port. Unrelated labels
/// are ignored.
#[must_use]
pub fn servers_from_labels(labels: &BTreeMap<String, String>) -> IndexMap<String, ServerConfig> {
    let mut by_port: BTreeMap<&str, (Option<&str>, ServerConfig)> = BTreeMap::new();

    for (key, value) in labels {
        let Some(rest) = key.strip_prefix(SERVER_LABEL_PREFIX) else {
            continue;
        };
        let Some((port, field)) = rest.rsplit_once('.') else {
            continue;
        };
        let entry = by_port.entry(port).or_insert_with(|| {
            (
                None,
                ServerConfig {
                    port: port.to_owned(),
                    ..ServerConfig::default()
                },
            )
        });
        match field {
            REF => entry.0 = Some(value.as_str()),
            PROTOCOL => entry.1.protocol = Some(value.clone()),
            PATH => entry.1.path = Some(value.clone()),
            INTERNAL => {
                entry
                    .1
                    .attributes
                    .insert(ServerConfig::INTERNAL_ATTRIBUTE.to_owned(), value.clone());
            }
            _ => {}
        }
    }

    by_port
        .into_iter()
        .map(|(port, (reference, server))| (reference.unwrap_or(port).to_owned(), server))
        .collect()
}
