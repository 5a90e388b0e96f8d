//! Command implementations

pub mod agents;
pub mod config;
pub mod convert;
pub mod up;
pub mod validate;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use workbay_common::DeclaredEnvironment;

use crate::domain::machine::RuntimeIdentity;

/// Arguments shared by commands that read an environment file.
#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    /// Environment file (YAML or JSON)
    pub file: PathBuf,

    /// Workspace id machines are created under
    #[arg(long, short = 'w', default_value = "local")]
    pub workspace: String,

    /// Environment name within the workspace
    #[arg(long, default_value = "default")]
    pub env_name: String,

    /// Owner recorded on every machine
    #[arg(long, env = "USER", default_value = "workbay")]
    pub owner: String,
}

impl EnvironmentArgs {
    #[must_use]
    pub fn identity(&self) -> RuntimeIdentity {
        RuntimeIdentity {
            workspace_id: self.workspace.clone(),
            env_name: self.env_name.clone(),
            owner: self.owner.clone(),
        }
    }

    /// Read and parse the environment file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self) -> Result<DeclaredEnvironment> {
        load_environment(&self.file)
    }
}

/// Parse a declared environment; `.json` files as JSON, anything else as YAML.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_environment(path: &Path) -> Result<DeclaredEnvironment> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }
}
