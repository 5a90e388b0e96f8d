//! Integration tests for the workbay CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! None of them needs a container engine.

mod cli_tests;
mod config_command;
