//! Unit tests for the workbay CLI
//!
//! These tests use mocked ports and run fast without docker or network I/O.

mod agent_launcher;
mod environment_pipeline;
mod machine_registry;
mod workspace_start_service;
