//! Infrastructure layer — concrete implementations of application port traits.
//!
//! Process execution, the docker engine, HTTP probing and the config file.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod docker;
pub mod http_probe;
