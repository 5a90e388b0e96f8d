//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{WorkbayConfig, apply_config_value, validate_config};

/// Load and validate configuration.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds invalid settings.
pub fn load_config(store: &impl ConfigStore) -> Result<WorkbayConfig> {
    let config = store.load()?;
    validate_config(&config)?;
    Ok(config)
}

/// Set one key and persist the result.
///
/// # Errors
///
/// Returns an error for unknown keys, invalid values, or write failures.
pub fn set_config_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<WorkbayConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    validate_config(&config)?;
    store.save(&config)?;
    Ok(config)
}
