//! Machine attributes pass.

use workbay_common::DeclaredEnvironment;

use super::model::EnvironmentModel;
use crate::domain::error::ValidationError;

/// Attribute carrying the container memory limit in bytes.
pub const MEMORY_LIMIT_ATTRIBUTE: &str = "memoryLimitBytes";

/// Apply declared machine attributes. A recipe-level memory limit wins over
/// the attribute.
///
/// # Errors
///
/// `IllegalAttribute` when `memoryLimitBytes` is not a positive integer,
/// `UnknownMachine` when attributes target a machine the model lacks.
pub fn provision(
    declared: &DeclaredEnvironment,
    mut model: EnvironmentModel,
) -> Result<EnvironmentModel, ValidationError> {
    for (machine, config) in &declared.machines {
        let Some(raw) = config.attributes.get(MEMORY_LIMIT_ATTRIBUTE) else {
            continue;
        };
        let limit = raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|bytes| *bytes > 0)
            .ok_or_else(|| ValidationError::IllegalAttribute {
                machine: machine.clone(),
                attribute: MEMORY_LIMIT_ATTRIBUTE.to_owned(),
                value: raw.clone(),
            })?;

        let container = model
            .get_mut(machine)
            .ok_or_else(|| ValidationError::UnknownMachine(machine.clone()))?;
        container.mem_limit.get_or_insert(limit);
    }
    Ok(model)
}
