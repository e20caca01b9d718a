//! Copy Mirror
//!
//! Entry point for the mirror agent: loads configuration, resolves the
//! operator wallet, reports its balance and runs the monitor loop until
//! Ctrl-C.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use copy_mirror::balance::check_balance;
use copy_mirror::config::Config;
use copy_mirror::cursor::InMemoryCursorStore;
use copy_mirror::endpoints;
use copy_mirror::monitor::Monitor;
use copy_mirror::rpc_manager::{LedgerRpc, SolanaLedgerRpc};
use copy_mirror::wallet::WalletManager;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "MIRROR_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Metrics port, overrides monitoring.metrics_port
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose)?;

    info!("🚀 Starting Copy Mirror");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    info!("📋 Loading configuration from: {}", args.config);
    let config = Config::from_file_with_env(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    config.validate().context("Invalid configuration")?;
    let addresses = config.watched_addresses()?;

    // Initialize wallet
    let wallet = WalletManager::resolve(&config.wallet).context("Failed to load operator wallet")?;

    // Initialize RPC client
    let rpc: Arc<dyn LedgerRpc> = Arc::new(SolanaLedgerRpc::new(
        &config.rpc.endpoint,
        config.commitment()?,
        config.rpc_timeout(),
    ));

    info!("🌐 RPC endpoint: {}", rpc.endpoint());

    let balance = check_balance(rpc.as_ref(), &wallet.pubkey())
        .await
        .context("Failed to read operator balance")?;

    info!("👁️ Watching {} wallets", addresses.len());
    for address in &addresses {
        info!("   {}", address);
    }
    info!("💼 Operator wallet: {}", wallet.pubkey());
    info!("💰 Operator balance: {}", balance);
    if balance.is_below(config.monitor.low_balance_sol) {
        warn!(
            "Operator balance is below {} SOL, mirrored transfers may fail",
            config.monitor.low_balance_sol
        );
    }

    // Initialize metrics
    if config.monitoring.enable_metrics {
        let metrics_port = args.metrics_port.unwrap_or(config.monitoring.metrics_port);
        info!("📊 Starting metrics server on port {}", metrics_port);
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(metrics_port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let monitor = Monitor::new(
        rpc,
        Arc::new(InMemoryCursorStore::new()),
        wallet,
        addresses,
        config.monitor.slippage_tolerance,
        config.monitor_settings(),
    );

    // Graceful shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("🛑 Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("🎬 Starting monitor loop...");
    monitor.run(shutdown_rx).await;

    info!("👋 Shutting down gracefully...");
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "copy_mirror=debug,info"
    } else {
        "copy_mirror=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}
