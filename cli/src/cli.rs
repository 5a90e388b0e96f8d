//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Provision and supervise development machines
#[derive(Parser)]
#[command(
    name = "workbay",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the provisioned machine model of an environment file
    Convert(commands::EnvironmentArgs),

    /// Check an environment file without starting anything
    Validate(commands::EnvironmentArgs),

    /// Start machines and agents, then supervise until Ctrl-C
    Up(commands::up::UpArgs),

    /// Inspect agents
    #[command(subcommand)]
    Agents(commands::agents::AgentsCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Default tracing directive for the `-v` count.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "workbay_cli=info,warn",
            2 => "workbay_cli=debug,info",
            _ => "trace",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let app = AppContext::new(&OutputFlags {
            no_color: self.no_color,
            quiet: self.quiet,
            json: self.json,
        });
        match self.command {
            Command::Convert(args) => commands::convert::run(&app, &args),
            Command::Validate(args) => commands::validate::run(&app, &args),
            Command::Up(args) => commands::up::run(&app, &args).await,
            Command::Agents(cmd) => commands::agents::run(&app, cmd),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
