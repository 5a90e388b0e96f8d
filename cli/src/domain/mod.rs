//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod machine;

pub use config::{WorkbayConfig, validate_config};
pub use error::{ConfigError, LaunchError, RegistryError, StartError, ValidationError};
pub use machine::{Instance, InstanceHandle, MachineEntry, MachineState, MachineStatus, RuntimeIdentity};
