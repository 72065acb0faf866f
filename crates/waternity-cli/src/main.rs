//! Waternity CLI
//!
//! Runs the well-staking ledger: a deterministic simulation, a live keeper,
//! or a dump of the effective configuration.

mod demo;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use waternity_core::prelude::*;
use waternity_economics::StaticPriceFeed;
use waternity_node::config::LoggingConfig;
use waternity_node::{Keeper, WaternityConfig, WaternityNode};

#[derive(Parser)]
#[command(name = "waternity")]
#[command(author = "Waternity Contributors")]
#[command(version)]
#[command(about = "Waternity - well staking, yield and automation ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); WATERNITY__* variables override it
    #[arg(short, long, global = true, env = "WATERNITY_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate the demo wells on a manual clock and print a JSON report
    Simulate {
        /// Simulated days
        #[arg(short, long, default_value = "30")]
        days: u64,

        /// Daily price move in basis points
        #[arg(long, default_value = "100", allow_hyphen_values = true)]
        drift_bps: i64,
    },

    /// Run the keeper loop against the demo wells until Ctrl-C
    Keeper {
        /// Stop after this many ticks
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Price served by the static feed
        #[arg(long, default_value_t = demo::DEMO_PRICE)]
        price: i64,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Version information
    Version,
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = WaternityConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose);

    match cli.command {
        Commands::Simulate { days, drift_bps } => {
            tracing::info!("Simulating {} days at {} bps/day price drift", days, drift_bps);
            let report = demo::simulate(config, days, drift_bps)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Keeper { ticks, price } => {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let feed = Arc::new(StaticPriceFeed::new(price, clock.now()));
            let keeper_config = config.keeper.clone();
            let node = Arc::new(WaternityNode::with_reserve_vault(config, clock, feed)?);
            let wells = demo::seed(&node)?;
            tracing::info!("Seeded {} demo wells", wells.len());

            let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(()).await;
                }
            });

            let mut keeper = Keeper::new(node.clone(), keeper_config);
            if let Some(ticks) = ticks {
                keeper = keeper.with_max_ticks(ticks);
            }
            let stats = keeper.run(shutdown_rx).await;

            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!("{}", serde_json::to_string_pretty(&node.get_automation_status())?);
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }

        Commands::Version => {
            println!("waternity {}", env!("CARGO_PKG_VERSION"));
            println!("Accrual: linear, {} bps denominator, {}-second year", BPS_DENOMINATOR, SECONDS_PER_YEAR);
            println!("Asset decimals: {}", ASSET_DECIMALS);
        }
    }

    Ok(())
}
