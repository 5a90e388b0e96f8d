//! `workbay convert` — print the normalized, provisioned environment model.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::commands::EnvironmentArgs;
use crate::domain::environment::{self, env_vars};

/// Run the convert command.
///
/// # Errors
///
/// Returns an error if the file is unreadable or the environment is invalid.
pub fn run(app: &AppContext, args: &EnvironmentArgs) -> Result<ExitCode> {
    let config = app.config()?;
    let declared = args.load()?;
    let providers = env_vars::default_providers(config.workspace.api_endpoint.clone());
    let prepared = environment::prepare(&declared, &args.identity(), &providers)?;

    if app.is_json() {
        app.output.print_json(&prepared.model)?;
    } else {
        let text = serde_yaml::to_string(&prepared.model).context("cannot serialize model")?;
        print!("{text}");
    }
    Ok(ExitCode::SUCCESS)
}
