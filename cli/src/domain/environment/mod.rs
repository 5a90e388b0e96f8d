//! Declared environment → normalized, validated `EnvironmentModel`.
//!
//! Pure and synchronous. Each pass takes the model by value and returns the
//! transformed model, so a failure never leaves a half-provisioned value
//! behind.

pub mod attributes;
pub mod convert;
pub mod env_vars;
pub mod model;
pub mod order;
pub mod servers;
pub mod validate;

use workbay_common::DeclaredEnvironment;

pub use env_vars::ServerEnvVarProvider;
pub use model::{BuildContext, ContainerConfig, EnvironmentModel};

use crate::domain::error::ValidationError;
use crate::domain::machine::RuntimeIdentity;

/// Result of the full preparation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEnvironment {
    pub model: EnvironmentModel,
    /// Machine names, dependencies first.
    pub start_order: Vec<String>,
    /// Machine carrying the workspace agent, if agents are declared.
    pub dev_machine: Option<String>,
}

/// Convert, provision and validate a declared environment.
///
/// # Errors
///
/// The first `ValidationError` any pass reports.
pub fn prepare(
    declared: &DeclaredEnvironment,
    identity: &RuntimeIdentity,
    providers: &[Box<dyn ServerEnvVarProvider>],
) -> Result<PreparedEnvironment, ValidationError> {
    let model = convert::convert(declared)?;
    let model = servers::provision(declared, model)?;
    let model = attributes::provision(declared, model)?;
    let model = env_vars::provision(model, identity, providers);
    validate::validate(declared, &model)?;
    let start_order = order::start_order(&model)?;
    let dev_machine = validate::dev_machine_name(declared)?.map(str::to_owned);

    Ok(PreparedEnvironment {
        model,
        start_order,
        dev_machine,
    })
}
