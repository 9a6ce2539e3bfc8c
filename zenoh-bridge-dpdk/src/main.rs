//! Zenoh bridge for DPDK telemetry.
//!
//! Polls DPDK telemetry sockets and publishes command responses to Zenoh
//! as structured metrics.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use dpdkscope_common::{connect, init_tracing};
use zenoh_bridge_dpdk::config::DpdkBridgeConfig;
use zenoh_bridge_dpdk::poller::DpdkPoller;

/// Zenoh bridge for DPDK telemetry.
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-dpdk")]
#[command(about = "Bridge DPDK telemetry to Zenoh", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the configuration file (JSON5 format).
    #[arg(short, long, default_value = "dpdk.json5")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = DpdkBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    tracing::info!(
        config = ?args.config,
        devices = config.dpdk.devices.len(),
        "Starting zenoh-bridge-dpdk"
    );

    // Connect to Zenoh
    let session = Arc::new(
        connect(&config.zenoh)
            .await
            .context("Failed to connect to Zenoh")?,
    );

    // Spawn device pollers
    let mut tasks = Vec::new();

    for device in config.dpdk.devices.clone() {
        let poller = DpdkPoller::new(
            device,
            session.clone(),
            &config.dpdk.key_prefix,
            &config.dpdk.command_groups,
            config.serialization,
        );

        tasks.push(tokio::spawn(async move {
            poller.run().await;
        }));
    }

    tracing::info!("Bridge running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    signal::ctrl_c().await?;

    tracing::info!("Shutting down...");

    // Abort all tasks
    for task in tasks {
        task.abort();
    }

    // Close Zenoh session
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Error closing Zenoh session");
    }

    tracing::info!("Goodbye!");

    Ok(())
}
