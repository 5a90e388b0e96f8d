//! JSON output helpers.
//!
//! Provides the error-object formatter used by all `--json` code paths when
//! a command fails.

use anyhow::{Context, Result};

use crate::domain::error::{ConfigError, LaunchError, RegistryError, StartError, ValidationError};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for the first typed error in `err`'s chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if cause.is::<ValidationError>() {
            return "VALIDATION";
        }
        if cause.is::<ConfigError>() {
            return "CONFIG";
        }
        if cause.is::<RegistryError>() {
            return "REGISTRY";
        }
        if let Some(launch) = cause.downcast_ref::<LaunchError>() {
            return launch_code(launch);
        }
        if let Some(start) = cause.downcast_ref::<StartError>() {
            match start {
                StartError::Validation(_) => return "VALIDATION",
                StartError::Registry(_) => return "REGISTRY",
                StartError::Engine { .. } => return "ENGINE",
                StartError::Agent(launch) => return launch_code(launch),
                StartError::Cancelled => return "CANCELLED",
            }
        }
    }
    "INTERNAL"
}

fn launch_code(err: &LaunchError) -> &'static str {
    match err {
        LaunchError::Timeout { .. } => "AGENT_TIMEOUT",
        LaunchError::MachineGone { .. } => "MACHINE_GONE",
        LaunchError::Cancelled { .. } => "CANCELLED",
        LaunchError::InvalidCheck { .. } => "VALIDATION",
        LaunchError::Engine { .. } => "ENGINE",
    }
}
