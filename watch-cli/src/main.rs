//! # navy-watch
//!
//! Operator CLI for the navy convoy watcher.
//!
//! ## Commands
//!
//! - `watch`: Stream container and key activity as it happens
//! - `queue create`: Push a convoy create request onto the orchestrator queue
//! - `queue destroy`: Push a convoy destroy request
//!
//! ## Example
//!
//! ```bash
//! # Watch both feeds for a minute
//! navy-watch watch --duration 60
//!
//! # Launch a convoy from a manifest
//! navy-watch queue create example_0123 manifests/oneapp.yml
//!
//! # Tear it down again
//! navy-watch queue destroy example_0123
//! ```
//!
//! Connection settings come from `--config <file>` or, without it, from
//! `NAVY_ETCD_ENDPOINT` / `ETCD_PORT_4001_TCP_ADDR` / `NAVY_DOCKER_SOCKET`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use watch_client::ClientConfig;

mod commands;

use commands::{queue, watch};

/// Watch navy convoy activity and queue convoy requests.
#[derive(Parser, Debug)]
#[command(name = "navy-watch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config file (defaults come from the environment)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Which feeds to watch.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedSelection {
    /// Containers and keys
    All,
    /// Container lifecycle events only
    Containers,
    /// Key mutations only
    Mutations,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream activity from the container runtime and the coordination store
    Watch {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(long, short)]
        duration: Option<u64>,

        /// Feeds to watch
        #[arg(long, value_enum, default_value = "all")]
        feed: FeedSelection,
    },

    /// Push a request onto the orchestrator's convoy queue
    Queue {
        #[command(subcommand)]
        request: QueueCommand,
    },
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// Launch a convoy from a manifest file
    Create {
        /// Convoy name
        name: String,
        /// Manifest file (passed through verbatim)
        manifest: PathBuf,
    },

    /// Tear a convoy down
    Destroy {
        /// Convoy name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch { duration, feed } => {
            watch::run(&config, feed, duration).await?;
        }
        Commands::Queue { request } => match request {
            QueueCommand::Create { name, manifest } => {
                queue::create(&config, &name, &manifest).await?;
            }
            QueueCommand::Destroy { name } => {
                queue::destroy(&config, &name).await?;
            }
        },
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ClientConfig::from_env()),
    }
}
