//! Runtime environment variables injected into every machine.

use indexmap::IndexMap;

use super::model::EnvironmentModel;
use crate::domain::machine::RuntimeIdentity;

pub const WORKSPACE_ID_VAR: &str = "WORKBAY_WORKSPACE_ID";
pub const ENV_NAME_VAR: &str = "WORKBAY_ENV_NAME";
pub const API_ENDPOINT_VAR: &str = "WORKBAY_API_ENDPOINT";

/// Produces at most one variable for a runtime.
pub trait ServerEnvVarProvider: Send + Sync {
    fn get(&self, identity: &RuntimeIdentity) -> Option<(String, String)>;
}

pub struct WorkspaceIdProvider;

impl ServerEnvVarProvider for WorkspaceIdProvider {
    fn get(&self, identity: &RuntimeIdentity) -> Option<(String, String)> {
        Some((WORKSPACE_ID_VAR.to_owned(), identity.workspace_id.clone()))
    }
}

pub struct EnvironmentNameProvider;

impl ServerEnvVarProvider for EnvironmentNameProvider {
    fn get(&self, identity: &RuntimeIdentity) -> Option<(String, String)> {
        Some((ENV_NAME_VAR.to_owned(), identity.env_name.clone()))
    }
}

/// Emits the API endpoint only when one is configured.
pub struct ApiEndpointProvider {
    pub endpoint: Option<String>,
}

impl ServerEnvVarProvider for ApiEndpointProvider {
    fn get(&self, _identity: &RuntimeIdentity) -> Option<(String, String)> {
        self.endpoint
            .as_ref()
            .filter(|e| !e.is_empty())
            .map(|e| (API_ENDPOINT_VAR.to_owned(), e.clone()))
    }
}

/// The providers every start uses, in registration order.
#[must_use]
pub fn default_providers(api_endpoint: Option<String>) -> Vec<Box<dyn ServerEnvVarProvider>> {
    vec![
        Box::new(WorkspaceIdProvider),
        Box::new(EnvironmentNameProvider),
        Box::new(ApiEndpointProvider {
            endpoint: api_endpoint,
        }),
    ]
}

/// Collect provider output and write it into every container.
///
/// Provider variables overwrite same-named container variables; others are
/// untouched. When two providers emit the same name the first registered
/// one wins.
#[must_use]
pub fn provision(
    mut model: EnvironmentModel,
    identity: &RuntimeIdentity,
    providers: &[Box<dyn ServerEnvVarProvider>],
) -> EnvironmentModel {
    let vars = collect(identity, providers);
    if vars.is_empty() {
        return model;
    }
    for container in model.machines.values_mut() {
        for (name, value) in &vars {
            container.environment.insert(name.clone(), value.clone());
        }
    }
    model
}

fn collect(
    identity: &RuntimeIdentity,
    providers: &[Box<dyn ServerEnvVarProvider>],
) -> IndexMap<String, String> {
    let mut vars = IndexMap::new();
    for (name, value) in providers.iter().filter_map(|p| p.get(identity)) {
        if vars.contains_key(&name) {
            tracing::warn!(variable = %name, "duplicate runtime variable from provider, keeping first value");
            continue;
        }
        vars.insert(name, value);
    }
    vars
}
