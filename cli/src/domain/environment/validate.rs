//! Pure environment validation: no I/O, no async.

use std::sync::LazyLock;

use regex::Regex;
use workbay_common::{DeclaredEnvironment, agent_ids};

use super::model::{EnvironmentModel, link_target};
use crate::domain::error::ValidationError;

/// Machine names become container names and DNS aliases.
pub static MACHINE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]*$").expect("valid regex")
});

/// Check a converted model against its declaration.
///
/// # Errors
///
/// Returns the first violation found: bad machine name, dangling
/// `depends_on`/`links` reference, declarations for unknown machines, or a
/// dev machine count other than one when agents are declared.
pub fn validate(
    declared: &DeclaredEnvironment,
    model: &EnvironmentModel,
) -> Result<(), ValidationError> {
    if model.is_empty() {
        return Err(ValidationError::NoMachines);
    }

    for (name, container) in model.iter() {
        if !MACHINE_NAME_RE.is_match(name) {
            return Err(ValidationError::InvalidMachineName(name.clone()));
        }
        let references = container
            .depends_on
            .iter()
            .map(|d| ("depends_on", d.as_str()))
            .chain(container.links.iter().map(|l| ("links", link_target(l))));
        for (field, target) in references {
            if model.get(target).is_none() {
                return Err(ValidationError::UnknownReference {
                    machine: name.clone(),
                    field,
                    target: target.to_owned(),
                });
            }
        }
    }

    if let Some(unknown) = declared.machines.keys().find(|m| model.get(m).is_none()) {
        return Err(ValidationError::UnknownMachine(unknown.clone()));
    }

    dev_machine_name(declared).map(|_| ())
}

/// Name of the machine carrying the workspace agent, `None` when no machine
/// declares agents at all.
///
/// # Errors
///
/// `DevMachine` listing the offenders when agents are declared but zero or
/// several machines carry the workspace agent.
pub fn dev_machine_name(declared: &DeclaredEnvironment) -> Result<Option<&str>, ValidationError> {
    if declared.machines.values().all(|m| m.agents.is_empty()) {
        return Ok(None);
    }
    let dev: Vec<&str> = declared
        .machines
        .iter()
        .filter(|(_, m)| m.agents.iter().any(|a| a == agent_ids::WS_AGENT))
        .map(|(name, _)| name.as_str())
        .collect();
    match dev.as_slice() {
        [single] => Ok(Some(single)),
        _ => Err(ValidationError::DevMachine {
            agent: agent_ids::WS_AGENT,
            machines: dev.join(", "),
        }),
    }
}
