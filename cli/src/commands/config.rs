//! `workbay config` — show and set configuration values.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::config_service;

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Print the config file location
    Path,
    /// Set configuration value
    Set {
        /// Configuration key, e.g. engine.machine_type
        key: String,
        /// Configuration value
        value: String,
    },
}

/// Run the config command.
///
/// # Errors
///
/// Returns an error for unreadable config, unknown keys or invalid values.
pub fn run(app: &AppContext, cmd: ConfigCommand) -> Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            let config = app.config()?;
            if app.is_json() {
                app.output.print_json(&config)?;
            } else {
                app.renderer()
                    .render_config(&config, &app.config_store.path()?);
            }
        }
        ConfigCommand::Path => {
            let path = app.config_store.path()?;
            if app.is_json() {
                app.output
                    .print_json(&serde_json::json!({ "path": path }))?;
            } else {
                println!("{}", path.display());
            }
        }
        ConfigCommand::Set { key, value } => {
            config_service::set_config_value(&app.config_store, &key, &value)?;
            if app.is_json() {
                app.output
                    .print_json(&serde_json::json!({ "key": key, "value": value }))?;
            } else {
                app.output.success(&format!("Set {key} = {value}"));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
