//! Machine start order.

use std::collections::HashSet;

use super::model::{EnvironmentModel, link_target};
use crate::domain::error::ValidationError;

/// Order machines so every machine starts after its `depends_on` and
/// `links` targets. Independent machines keep model order.
///
/// References to machines outside the model are ignored here; `validate`
/// reports them.
///
/// # Errors
///
/// `DependencyCycle` naming the machines that could not be ordered.
pub fn start_order(model: &EnvironmentModel) -> Result<Vec<String>, ValidationError> {
    let deps: Vec<(&str, Vec<&str>)> = model
        .iter()
        .map(|(name, c)| {
            let targets = c
                .depends_on
                .iter()
                .map(String::as_str)
                .chain(c.links.iter().map(|l| link_target(l)))
                .filter(|t| model.get(t).is_some())
                .collect();
            (name.as_str(), targets)
        })
        .collect();

    let mut placed: HashSet<&str> = HashSet::with_capacity(deps.len());
    let mut order = Vec::with_capacity(deps.len());

    while order.len() < deps.len() {
        let next = deps
            .iter()
            .find(|(name, targets)| {
                !placed.contains(name) && targets.iter().all(|t| placed.contains(t))
            })
            .map(|(name, _)| *name);

        let Some(name) = next else {
            let stuck: Vec<&str> = deps
                .iter()
                .map(|(name, _)| *name)
                .filter(|name| !placed.contains(name))
                .collect();
            return Err(ValidationError::DependencyCycle(stuck.join(", ")));
        };
        placed.insert(name);
        order.push(name.to_owned());
    }
    Ok(order)
}
