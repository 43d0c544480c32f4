//! CLI for the browser download hand-off engine.

mod bridge;
mod commands;
mod receiver;

use anyhow::Result;
use clap::{Parser, Subcommand};
use handoff_core::config;

use commands::{run_bridge, run_clear, run_ledger, run_listen};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "handoff")]
#[command(about = "Hand browser downloads off to an external download agent", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Read host events (JSON lines) from stdin and hand downloads off to the agent.
    /// Cancellation requests are written to stdout, one JSON line each.
    Run {
        /// The host has no download-naming event; correlate on download creation instead.
        #[arg(long)]
        no_naming_event: bool,
        /// Override the agent endpoint port from the config.
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Show the persisted request ledger.
    Ledger {
        /// Print the raw JSON snapshot instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Delete the persisted request ledger.
    Clear,

    /// Run a reference agent endpoint that prints received descriptors and acknowledges them.
    Listen {
        /// Port to listen on (default: the configured endpoint port).
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
        /// Answer with HTTP 503 so the browser keeps every download.
        #[arg(long)]
        refuse: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                no_naming_event,
                port,
            } => {
                if let Some(port) = port {
                    cfg.endpoint_port = port;
                }
                run_bridge(&cfg, !no_naming_event).await?;
            }
            CliCommand::Ledger { json } => run_ledger(&cfg, json).await?,
            CliCommand::Clear => run_clear(&cfg).await?,
            CliCommand::Listen { port, refuse } => {
                let port = port.unwrap_or(cfg.endpoint_port);
                run_listen(&cfg.endpoint_host, port, refuse).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
