//! Command-line front end for publishing static sites to Walrus.
//!
//! Usage:
//!   walrus-deploy deploy ./dist --epochs 5
//!   walrus-deploy update ./dist 0x... --epochs 5
//!   walrus-deploy status 0x...
//!   walrus-deploy cost ./dist --epochs 10
//!   walrus-deploy spend 0x<address>
//!
//! Environment:
//!   WALRUS_DEPLOY_*  - see `WorkflowConfig::from_env` (a `.env` file is loaded)
//!   RUST_LOG         - tracing filter (default: info, debug with --verbose)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use walrus_deploy_rs::{
    display, resolve_binary, CostEngine, CostOptions, Network, ProcessRunner, SiteWorkflow,
    SuiRpcClient, WorkflowConfig,
};

#[derive(Parser)]
#[command(name = "walrus-deploy")]
#[command(about = "Publish, update and inspect static sites on Walrus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Target network (mainnet, testnet, devnet, localnet)
    #[arg(long, global = true)]
    network: Option<Network>,

    /// site-builder configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sui fullnode RPC URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Use the network's current reference gas price for estimates
    #[arg(long, global = true)]
    live_gas: bool,

    /// Capture deployer output without echoing it
    #[arg(long, global = true)]
    quiet: bool,

    /// Debug logging and full child output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a new site
    Deploy {
        dir: PathBuf,
        #[arg(long, default_value_t = 1)]
        epochs: u32,
    },
    /// Publish changes to an existing site
    Update {
        dir: PathBuf,
        object_id: String,
        #[arg(long, default_value_t = 1)]
        epochs: u32,
    },
    /// Delete a site and its resources
    Destroy { object_id: String },
    /// List the resources of a site
    Status { object_id: String },
    /// Estimate the cost of publishing a directory or a raw size
    Cost {
        /// Site directory to measure
        dir: Option<PathBuf>,
        /// Payload size in bytes, instead of a directory
        #[arg(long, conflicts_with = "dir")]
        size: Option<u64>,
        /// Number of files (estimated from size when omitted)
        #[arg(long, requires = "size")]
        files: Option<u64>,
        #[arg(long, default_value_t = 1)]
        epochs: u32,
    },
    /// Show what an address's latest transaction spent
    Spend { address: String },
}

fn rpc_url(config: &WorkflowConfig) -> String {
    config
        .rpc_url
        .clone()
        .unwrap_or_else(|| config.network.default_rpc_url().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
    display::set_verbose(cli.verbose);

    let mut config = WorkflowConfig::from_env().context("invalid WALRUS_DEPLOY_* setting")?;
    if let Some(network) = cli.network {
        config.network = network;
    }
    if let Some(path) = cli.config {
        config.site_builder_config = Some(path);
    }
    if cli.rpc_url.is_some() {
        config.rpc_url = cli.rpc_url;
    }
    if cli.quiet {
        config.stream_output = false;
    }
    if cli.live_gas && config.gas_price.is_none() {
        match SuiRpcClient::new(rpc_url(&config))?.reference_gas_price().await {
            Ok(price) => config.gas_price = Some(price),
            Err(e) => tracing::warn!("live gas price unavailable, using default: {}", e),
        }
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted, stopping child process...");
            on_signal.cancel();
        }
    });

    let runner = ProcessRunner::new();

    match cli.command {
        Commands::Deploy { dir, epochs } => {
            let workflow = SiteWorkflow::new(&runner, config);
            workflow.deploy(&dir, epochs, Some(&cancel)).await?;
        }
        Commands::Update {
            dir,
            object_id,
            epochs,
        } => {
            let workflow = SiteWorkflow::new(&runner, config);
            workflow
                .update(&dir, &object_id, epochs, Some(&cancel))
                .await?;
        }
        Commands::Destroy { object_id } => {
            let workflow = SiteWorkflow::new(&runner, config);
            workflow.destroy(&object_id, Some(&cancel)).await?;
        }
        Commands::Status { object_id } => {
            let workflow = SiteWorkflow::new(&runner, config);
            workflow.status(&object_id, Some(&cancel)).await?;
        }
        Commands::Cost {
            dir,
            size,
            files,
            epochs,
        } => match (dir, size) {
            (Some(dir), _) => {
                let workflow = SiteWorkflow::new(&runner, config);
                workflow.estimate(&dir, epochs).await?;
            }
            (None, Some(size)) => {
                let mut opts = CostOptions::new(size, epochs, config.network)
                    .with_file_count(files.unwrap_or(0));
                if let Some(price) = config.gas_price {
                    opts = opts.with_gas_price(price);
                }
                if let Some(rpc) = &config.rpc_url {
                    opts = opts.with_rpc_url(rpc.clone());
                }
                if let Ok(walrus) = resolve_binary(&config.walrus_bin) {
                    opts = opts.with_walrus_bin(walrus);
                }
                let breakdown = CostEngine::new(&runner)
                    .with_pricing_timeout(config.pricing_timeout)
                    .calculate(&opts, None)
                    .await?;
                display::print_cost_breakdown(&breakdown);
            }
            (None, None) => anyhow::bail!("pass a site directory or --size <bytes>"),
        },
        Commands::Spend { address } => {
            let client = SuiRpcClient::new(rpc_url(&config))?;
            match client
                .last_transaction_spend(&address)
                .await
                .with_context(|| format!("querying {}", client.url()))?
            {
                Some(report) => {
                    println!("Transaction {}", report.digest);
                    if report.spends.is_empty() {
                        println!("  no outgoing balance changes");
                    }
                    for spend in &report.spends {
                        println!("  {:.6} {}  ({})", spend.amount(), spend.symbol, spend.coin_type);
                    }
                }
                None => println!("No transactions sent by {}", address),
            }
        }
    }

    Ok(())
}
