//! cachewatchd: the cachewatch daemon.
//!
//! Assembles the health pipeline from configuration files:
//! - Daemon config (flush interval, event log size, channel capacity)
//! - Monitor config (servers and profiles)
//! - Optional topology snapshot
//!
//! # Usage
//!
//! ```text
//! cachewatchd replay --config cachewatch.toml --monitor monitor.toml --results polls.jsonl
//! cachewatchd check-config --config cachewatch.toml --monitor monitor.toml
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

mod replay;

#[derive(Parser)]
#[command(name = "cachewatchd", about = "CDN cache health daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed recorded poll results through the health pipeline and print
    /// the resulting state as JSON.
    Replay {
        /// Daemon config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Monitor config with servers and profiles (TOML).
        #[arg(long)]
        monitor: PathBuf,

        /// Topology snapshot (TOML).
        #[arg(long)]
        topology: Option<PathBuf>,

        /// Poll results, one JSON object per line.
        #[arg(long)]
        results: PathBuf,
    },
    /// Validate configuration files and exit.
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        monitor: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cachewatchd=debug,cachewatch=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            config,
            monitor,
            topology,
            results,
        } => {
            let inputs =
                replay::ReplayInputs::load(config.as_deref(), &monitor, topology.as_deref())?;
            let polls = replay::read_results(&results)?;
            let report = replay::run(inputs, polls).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::CheckConfig { config, monitor } => {
            let inputs = replay::ReplayInputs::load(config.as_deref(), &monitor, None)?;
            info!(
                servers = inputs.monitor_config.traffic_server.len(),
                profiles = inputs.monitor_config.profile.len(),
                flush_interval = %inputs.config.health_flush_interval,
                "configuration is valid"
            );
            Ok(())
        }
    }
}
