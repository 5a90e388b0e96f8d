//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::PathBuf;
use std::process::Output;

use anyhow::Result;

use crate::domain::config::WorkbayConfig;
use crate::domain::environment::ContainerConfig;
use crate::domain::machine::{InstanceHandle, MachineState};

// ── Container Engine Port ─────────────────────────────────────────────────────

/// The container runtime that hosts machines.
///
/// Errors mean "the engine could not answer"; callers decide whether that is
/// fatal (start, destroy) or just a failed observation (liveness).
#[allow(async_fn_in_trait)]
pub trait ContainerEngine {
    /// Machine type agents are matched against, e.g. `"docker"`.
    fn machine_type(&self) -> &str;
    /// Create and start a container for `machine`.
    async fn start_container(
        &self,
        machine: &MachineState,
        config: &ContainerConfig,
    ) -> Result<InstanceHandle>;
    /// Run `script` inside the container without waiting for it to finish.
    async fn exec_detached(&self, handle: &InstanceHandle, script: &str) -> Result<()>;
    /// Whether a process whose command line contains `name` is running.
    async fn is_process_running(&self, handle: &InstanceHandle, name: &str) -> Result<bool>;
    /// Whether the container port (`22/tcp`) accepts connections.
    async fn is_port_listening(&self, handle: &InstanceHandle, port: &str) -> Result<bool>;
    /// `host:port` the container port is published on, if any.
    async fn host_address(&self, handle: &InstanceHandle, port: &str) -> Result<Option<String>>;
    /// Whether the container still exists and runs.
    async fn is_alive(&self, handle: &InstanceHandle) -> Result<bool>;
    /// Remove the container, stopping it first.
    async fn destroy_container(&self, handle: &InstanceHandle) -> Result<()>;
}

// ── HTTP Probe Port ───────────────────────────────────────────────────────────

/// One HTTP GET; returns the status code. Implementations bound the request
/// with a short timeout.
#[allow(async_fn_in_trait)]
pub trait HttpProbe {
    async fn ping(&self, url: &str) -> Result<u16>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load the config, falling back to defaults when no file exists.
    fn load(&self) -> Result<WorkbayConfig>;
    /// Persist the config.
    fn save(&self, config: &WorkbayConfig) -> Result<()>;
    /// Location of the config file.
    fn path(&self) -> Result<PathBuf>;
}
