// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Replica Watchdog
//!
//! Watches MariaDB replicas and fixes the replication failures that have a
//! known, safe fix.
//!
//! ## Architecture
//!
//! One monitor task per replica. Monitors share nothing but read-only
//! configuration:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                          TargetMonitor (per replica)                  │
//! │                                                                       │
//! │  ┌──────────────┐    ┌────────────┐    ┌───────────────────────────┐  │
//! │  │ SlaveStatus  │───►│ Indicator  │───►│ Action: skip / optimize / │  │
//! │  │ (SHOW SLAVE  │    │ (lag trend)│    │ reset_position / none     │  │
//! │  │  STATUS)     │    └────────────┘    └───────────────────────────┘  │
//! │  └──────────────┘                                   │                 │
//! │                                                     ▼                 │
//! │                     ┌────────────────┐    ┌───────────────────────┐   │
//! │                     │ ErrorSequence  │    │ Backoff               │   │
//! │                     │ (log episodes) │    │ (poll pacing)         │   │
//! │                     └────────────────┘    └───────────────────────┘   │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Remediations
//!
//! | Condition | Action |
//! |-----------|--------|
//! | `Exec_Master_Log_Pos > Read_Master_Log_Pos` | `CHANGE MASTER TO master_log_pos=N` |
//! | errno 1062 (duplicate key) | skip one transaction |
//! | errno 1942 (parallel apply exhausted) | retune parallel apply |
//!
//! While a fix keeps being needed the monitor polls every 25ms. A healthy
//! replica is polled progressively less often, up to once per
//! `max_backoff_seconds`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use replica_watchdog::{monitor, WatchdogConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = WatchdogConfig::load("config.toml")?;
//!     let failed = monitor::run_all(config).await;
//!     eprintln!("{} monitor(s) failed", failed);
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod indicator;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod remediation;
pub mod replica;
pub mod sequence;
pub mod status;
pub mod tracker;

// Re-exports for convenience
pub use config::{ConnectionSettings, GlobalConfig, PollIntervals, Target, WatchdogConfig};
pub use error::{MonitorError, Result};
pub use indicator::Indicator;
pub use monitor::{MonitorEvent, PollOutcome, PollReport, TargetMonitor};
pub use remediation::Action;
pub use replica::{MariaDbReplica, ReplicaConnection};
pub use status::SlaveStatus;
pub use tracker::LagTracker;
