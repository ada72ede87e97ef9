//! fedchain daemon: entry point for running a federation node.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use fedchain_node::{init_logging, FedNode, LogFormat, NodeConfig};
use fedchain_store::BackendKind;
use fedchain_types::{KeyPair, PublicKey};

#[derive(Parser)]
#[command(name = "fedchain-daemon", about = "fedchain federation node daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "FEDCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Storage backend: "lmdb" or "memory".
    #[arg(long, env = "FEDCHAIN_BACKEND")]
    backend: Option<String>,

    /// Data directory for ledger storage.
    #[arg(long, env = "FEDCHAIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Node keypair file.
    #[arg(long, env = "FEDCHAIN_KEYPAIR_PATH")]
    keypair_path: Option<PathBuf>,

    /// Federation public keys (comma-separated base58).
    #[arg(long, env = "FEDCHAIN_FEDERATION", value_delimiter = ',')]
    federation: Vec<String>,

    /// Connection attempts before a store operation fails.
    #[arg(long, env = "FEDCHAIN_MAX_TRIES")]
    max_tries: Option<u32>,

    /// Seconds before a backlog assignment counts as stale.
    #[arg(long, env = "FEDCHAIN_REASSIGN_DELAY_SECS")]
    reassign_delay_secs: Option<u64>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "FEDCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "FEDCHAIN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Dump Prometheus metrics on shutdown.
    #[arg(long, env = "FEDCHAIN_ENABLE_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Node lifecycle.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Generate a node keypair and print its public key.
    Keygen {
        /// Where to write the keypair (defaults to the configured path).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until SIGINT/SIGTERM.
    Run,
    /// Create the keypair if missing and write the genesis block.
    Init,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };

    if let Some(backend) = &cli.backend {
        config.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(path) = &cli.keypair_path {
        config.keypair_path = path.clone();
    }
    if !cli.federation.is_empty() {
        config.federation = cli
            .federation
            .iter()
            .map(|k| k.parse::<PublicKey>())
            .collect::<Result<_, _>>()
            .context("parsing --federation")?;
    }
    if let Some(n) = cli.max_tries {
        config.max_tries = n;
    }
    if let Some(secs) = cli.reassign_delay_secs {
        config.reassign_delay_secs = secs;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.enable_metrics |= cli.metrics;
    config.validate()?;
    Ok(config)
}

fn write_new_keypair(path: &Path) -> anyhow::Result<KeyPair> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let keypair = fedchain_crypto::generate_keypair();
    fedchain_crypto::save_keypair(&keypair, path)
        .with_context(|| format!("writing keypair {}", path.display()))?;
    tracing::info!(path = %path.display(), public_key = %keypair.public, "keypair generated");
    Ok(keypair)
}

fn load_keypair(path: &Path) -> anyhow::Result<KeyPair> {
    fedchain_crypto::load_keypair(path).with_context(|| {
        format!(
            "reading keypair {} (run `fedchain-daemon keygen` or `node init` first)",
            path.display()
        )
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format.parse::<LogFormat>()?, &config.log_level)?;

    match cli.command {
        Command::Keygen { out } => {
            let path = out.unwrap_or_else(|| config.keypair_path.clone());
            let keypair = write_new_keypair(&path)?;
            println!("{}", keypair.public);
        }
        Command::Node { action } => match action {
            NodeAction::Init => {
                let keypair = if config.keypair_path.exists() {
                    load_keypair(&config.keypair_path)?
                } else {
                    write_new_keypair(&config.keypair_path)?
                };
                let public = keypair.public;
                let node = FedNode::new(config, keypair).await?;
                tracing::info!(genesis = %node.genesis().id, "node initialised");
                println!("{public}");
            }
            NodeAction::Run => {
                let keypair = load_keypair(&config.keypair_path)?;
                tracing::info!(
                    backend = %config.backend,
                    data_dir = %config.data_dir.display(),
                    federation = config.federation.len(),
                    "starting fedchain node"
                );
                let mut node = FedNode::new(config, keypair).await?;
                node.run().await;

                if node.config.enable_metrics {
                    tracing::info!(metrics = %node.metrics.encode()?, "final metrics");
                }
                tracing::info!("fedchain daemon exited cleanly");
            }
        },
    }

    Ok(())
}
