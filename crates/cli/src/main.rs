//! op-conductor-ops
//!
//! Operator CLI for sequencer clusters managed by op-conductor.
//! Every command re-reads the live state of the named network before acting.

use anyhow::{Context, Result};
use clap::Parser;
use conductor_ops::{OpsConfig, RpcClient, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod render;

use commands::Command;

/// CLI for managing OP Conductor sequencers
#[derive(Parser, Debug)]
#[command(name = "op-conductor-ops")]
#[command(
    about = "CLI for managing OP Conductor sequencers. WARNING: this tool can cause a network outage if used improperly.",
    long_about = None
)]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "CONDUCTOR_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Certificate file for https; takes precedence over cert_path in the config
    #[arg(long, env = "CONDUCTOR_CERT", global = true)]
    cert: Option<PathBuf>,

    /// Per-call RPC timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = OpsConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let client = RpcClient::http(&config.http_settings(args.cert, args.timeout))?;
    let mut registry = config.registry();
    tracing::debug!(
        "Loaded {} network(s) from {}",
        registry.len(),
        args.config.display()
    );

    commands::run(args.command, &mut registry, &client).await
}
