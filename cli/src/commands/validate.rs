//! `workbay validate` — check an environment file without starting anything.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::commands::EnvironmentArgs;
use crate::domain::environment::{self, env_vars};
use crate::domain::error::ValidationError;

/// Run the validate command.
///
/// Also checks that every requested agent id is known to the configuration.
///
/// # Errors
///
/// Returns an error if the file is unreadable or the environment is invalid.
pub fn run(app: &AppContext, args: &EnvironmentArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let declared = args.load()?;
    let providers = env_vars::default_providers(config.workspace.api_endpoint.clone());
    let prepared = environment::prepare(&declared, &args.identity(), &providers)?;

    let agents = config.effective_agents();
    for (machine, machine_config) in &declared.machines {
        if let Some(unknown) = machine_config
            .agents
            .iter()
            .find(|id| !agents.iter().any(|a| &a.id == *id))
        {
            return Err(ValidationError::UnknownAgent {
                machine: machine.clone(),
                agent: unknown.clone(),
            }
            .into());
        }
    }

    if app.is_json() {
        app.output.print_json(&serde_json::json!({
            "valid": true,
            "recipe": declared.recipe.kind(),
            "start_order": prepared.start_order,
            "dev_machine": prepared.dev_machine,
        }))?;
    } else {
        app.renderer().render_prepared(&prepared);
    }
    Ok(ExitCode::SUCCESS)
}
