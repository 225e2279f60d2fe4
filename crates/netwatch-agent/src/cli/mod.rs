//! CLI command definitions for the `netwatch` binary.

pub mod register;
pub mod run;
pub mod topology;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Publish deduplicated network transactions for a fleet of sniffing agents.
#[derive(Parser)]
#[command(name = "netwatch", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the agent configuration file.
    #[arg(long, global = true, default_value = netwatch_infra::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter derived from the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,netwatch=debug,netwatch_core=debug,netwatch_infra=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register this agent, keep the directory fresh, and publish
    /// transactions read as JSON lines from stdin.
    Run {
        /// Local address to register (repeatable). Overrides discovery.
        #[arg(long = "addr")]
        addresses: Vec<String>,
    },

    /// Reconcile this agent's directory entries once.
    Register {
        /// Local address to register (repeatable). Overrides discovery.
        #[arg(long = "addr")]
        addresses: Vec<String>,
    },

    /// Fetch and print the fleet directory.
    Topology,
}
