// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `replica-watchdog` binary: load config, start one monitor per replica,
//! run until every monitor exits or Ctrl-C.

use anyhow::{bail, Context, Result};
use clap::Parser;
use replica_watchdog::logging::{self, LogFormat};
use replica_watchdog::{monitor, WatchdogConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "replica-watchdog")]
#[command(about = "MariaDB replication watchdog with automatic remediation")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Compat)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    logging::init(args.log_format);

    let config = WatchdogConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let total = config.targets.len();
    info!("Loaded {} target(s) from config", total);

    tokio::select! {
        failed = monitor::run_all(config) => {
            if failed == total {
                bail!("All {} monitor(s) failed to start", total);
            }
            info!("All monitors stopped");
        }
        _ = shutdown_signal() => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
