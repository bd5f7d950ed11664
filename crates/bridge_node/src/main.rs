//! The bridge validation server.
//!
//! Observes token transfers into the bridge escrow on the foreign chain and
//! confirms them on the home chain under this replica's validator identity.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

mod config;
mod node;
mod setup;
mod signals;
mod supervisor;
mod trace_util;

use crate::config::load_config;
use crate::node::run_bridge_node;
use crate::trace_util::configure_tracing;

/// The Bridge Validation Server.
///
/// Configuration can be made using a TOML file or via environment variables.
/// See config.rs for valid configuration options and defaults.
#[derive(Debug, Parser)]
#[command(name = "bridge_node", version)]
struct Args {
    /// Path to a config file.
    #[arg(short, long, value_name = "PATH", env = "BRIDGE_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Invalid config file: {error:#}");
            return ExitCode::FAILURE;
        }
    };
    let reload_handle = configure_tracing(&config.logging.filter);
    info!("Loaded configuration file from {}", args.config.display());

    match run_bridge_node(config, args.config, reload_handle).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("Application error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
