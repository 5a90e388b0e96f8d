//! Application context — unified state passed to every command handler.
//!
//! Built once in `Cli::run()`; infrastructure adapters that depend on the
//! loaded configuration are constructed on demand.

use std::time::Duration;

use anyhow::Result;

use crate::application::services::config_service;
use crate::domain::config::WorkbayConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::docker::DockerEngine;
use crate::infra::http_probe::ReqwestProbe;
use crate::output::OutputContext;
use crate::output::human::HumanRenderer;

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode, JSON mode).
    pub output: OutputContext,
    /// Configuration file store.
    pub config_store: YamlConfigStore,
}

impl AppContext {
    #[must_use]
    pub fn new(flags: &OutputFlags) -> Self {
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet, flags.json),
            config_store: YamlConfigStore::default(),
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.output.json
    }

    #[must_use]
    pub fn renderer(&self) -> HumanRenderer<'_> {
        HumanRenderer::new(&self.output)
    }

    /// Load and validate the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or invalid.
    pub fn config(&self) -> Result<WorkbayConfig> {
        config_service::load_config(&self.config_store)
    }

    /// Docker engine bounded by the configured command timeout.
    #[must_use]
    pub fn engine(&self, config: &WorkbayConfig) -> DockerEngine<TokioCommandRunner> {
        let runner =
            TokioCommandRunner::new(Duration::from_secs(config.engine.command_timeout_secs));
        DockerEngine::new(runner, config.engine.machine_type.clone())
    }

    /// HTTP probe bounded by the configured per-request timeout.
    #[must_use]
    pub fn http_probe(&self, config: &WorkbayConfig) -> ReqwestProbe {
        ReqwestProbe::new(Duration::from_millis(config.agents.http_probe_timeout_ms))
    }
}
