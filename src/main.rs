//! # Watt Node
//!
//! Mains energy telemetry node. Samples current once per interval, uploads
//! one reading per period, and keeps undelivered readings on disk until the
//! ingestion endpoint is reachable again.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use watt_node::config::{Config, LoggingConfig};
use watt_node::TelemetryNode;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of ticks between status log messages
const STATUS_INTERVAL_TICKS: u64 = 300;

/// Prefix for rolled log files
const LOG_FILE_PREFIX: &str = "watt-node.log";

/// Main entry point for the telemetry node
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging to stdout or a daily rolling file
///    - Restore the offline backlog and make the first connection attempt
///
/// 2. **Main Loop**
///    - One tick per sampling interval: link check, sensor read,
///      aggregation, delivery or buffering
///    - Log buffer and link status every few minutes
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration file exists but is invalid
/// - The log directory cannot be used
/// - The uplink endpoint cannot be parsed
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)?;

    let _log_guard = init_logging(&config.logging)?;

    info!("Watt Node v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Device ID: {}", config.device.device_id);
    info!("Uplink endpoint: {}", config.uplink.endpoint);

    let mut node = TelemetryNode::from_config(&config).context("Failed to build telemetry node")?;
    tokio::task::block_in_place(|| node.start(config.buffer.restore_on_boot));

    let mut ticker = interval(config.sampling.interval());
    // A tick can block on an upload for up to the uplink timeout
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Sampling every {} ms", config.sampling.interval_ms);
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tokio::task::block_in_place(|| node.tick());
                tick_count += 1;

                if tick_count % STATUS_INTERVAL_TICKS == 0 {
                    let stats = node.pipeline().stats();
                    info!(
                        "Status: link {:?}, {} buffered, {} live / {} replayed uploads, {} evicted",
                        node.pipeline().link_state(),
                        node.pipeline().buffer().len(),
                        stats.delivered_live,
                        stats.delivered_from_buffer,
                        stats.evicted
                    );
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!(
                    "{} readings remain buffered at {}",
                    node.pipeline().buffer().len(),
                    node.pipeline().buffer().snapshot_path().display()
                );
                break;
            }
        }
    }

    Ok(())
}

/// Loads the configuration file, falling back to defaults if it is absent
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        eprintln!("Config file {} not found, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. The returned guard must stay
/// alive for buffered file output to be flushed.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}
