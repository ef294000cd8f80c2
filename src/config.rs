// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the replica watchdog.
//!
//! Everything the monitors need is loaded once at startup into a
//! [`WatchdogConfig`] and never mutated afterwards. The [`GlobalConfig`] part
//! is shared read-only across all monitor tasks behind an `Arc`.
//!
//! # Configuration Structure
//!
//! ```text
//! WatchdogConfig
//! ├── global: GlobalConfig            # remediation + backoff tunables
//! ├── intervals: PollIntervals        # idle / burst / retry sleeps
//! ├── connection: ConnectionSettings  # timeouts + pool lifetime
//! └── targets: Vec<Target>            # one per monitored replica
//! ```
//!
//! # TOML Example
//!
//! ```toml
//! [defaults]
//! max_backoff_seconds = 15
//! backoff_success_count = 5
//! master_log_pos = 4
//! idle_interval = "500ms"
//!
//! [replica-eu-1]
//! host = "10.0.0.11"
//! port = 3306
//! username = "watchdog"
//! password = "secret"
//!
//! [replica-eu-2]
//! host = "10.0.0.12"
//! username = "watchdog"
//! password = "secret"
//! ```
//!
//! The `[defaults]` table is optional. Every other top-level table is a
//! target, named by its key, in file order.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the table holding global tunables.
pub const DEFAULTS_SECTION: &str = "defaults";

/// Port used when a target omits one.
pub const DEFAULT_PORT: u16 = 3306;

// ═══════════════════════════════════════════════════════════════════════════════
// GlobalConfig: remediation and backoff tunables
// ═══════════════════════════════════════════════════════════════════════════════

/// Tunables shared by every monitor.
///
/// The first three feed the `optimize` remediation, `master_log_pos` feeds
/// `reset_position`, and the last two drive the backoff controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// `slave_parallel_max_queued` applied when parallel apply is exhausted.
    #[serde(default = "default_slave_parallel_max_queued")]
    pub slave_parallel_max_queued: u64,

    /// `slave_parallel_threads` applied when parallel apply is exhausted.
    #[serde(default = "default_slave_parallel_threads")]
    pub slave_parallel_threads: u32,

    /// `slave_domain_parallel_threads` applied when parallel apply is exhausted.
    #[serde(default = "default_slave_domain_parallel_threads")]
    pub slave_domain_parallel_threads: u32,

    /// Log position to reset to when Exec_Master_Log_Pos > Read_Master_Log_Pos.
    #[serde(default = "default_master_log_pos")]
    pub master_log_pos: u64,

    /// Backoff ceiling in seconds.
    #[serde(default = "default_max_backoff_seconds")]
    pub max_backoff_seconds: u32,

    /// Consecutive healthy polls required before backoff starts growing.
    #[serde(default = "default_backoff_success_count")]
    pub backoff_success_count: u32,
}

fn default_slave_parallel_max_queued() -> u64 {
    262_144 // 256 KiB
}

fn default_slave_parallel_threads() -> u32 {
    3
}

fn default_slave_domain_parallel_threads() -> u32 {
    2
}

fn default_master_log_pos() -> u64 {
    4 // first event after the binlog header
}

fn default_max_backoff_seconds() -> u32 {
    15
}

fn default_backoff_success_count() -> u32 {
    5
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            slave_parallel_max_queued: default_slave_parallel_max_queued(),
            slave_parallel_threads: default_slave_parallel_threads(),
            slave_domain_parallel_threads: default_slave_domain_parallel_threads(),
            master_log_pos: default_master_log_pos(),
            max_backoff_seconds: default_max_backoff_seconds(),
            backoff_success_count: default_backoff_success_count(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PollIntervals: sleeps between and within poll cycles
// ═══════════════════════════════════════════════════════════════════════════════

const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_BURST_INTERVAL: Duration = Duration::from_millis(25);
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Sleep intervals for the polling loop, as humantime strings (e.g. `"500ms"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollIntervals {
    /// Sleep between outer cycles while not backed off.
    #[serde(default = "default_idle_interval")]
    pub idle_interval: String,

    /// Sleep between consecutive polls inside a remediation burst.
    /// Kept far below `idle_interval` so active fixing converges quickly.
    #[serde(default = "default_burst_interval")]
    pub burst_interval: String,

    /// Delay before retrying after a failed query or remediation.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,
}

fn default_idle_interval() -> String {
    "500ms".to_string()
}

fn default_burst_interval() -> String {
    "25ms".to_string()
}

fn default_retry_delay() -> String {
    "1s".to_string()
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            idle_interval: default_idle_interval(),
            burst_interval: default_burst_interval(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl PollIntervals {
    /// Near-zero intervals so tests don't sleep.
    pub fn for_testing() -> Self {
        Self {
            idle_interval: "1ms".to_string(),
            burst_interval: "1ms".to_string(),
            retry_delay: "1ms".to_string(),
        }
    }

    pub fn idle_interval_duration(&self) -> Duration {
        humantime::parse_duration(&self.idle_interval).unwrap_or(DEFAULT_IDLE_INTERVAL)
    }

    pub fn burst_interval_duration(&self) -> Duration {
        humantime::parse_duration(&self.burst_interval).unwrap_or(DEFAULT_BURST_INTERVAL)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        humantime::parse_duration(&self.retry_delay).unwrap_or(DEFAULT_RETRY_DELAY)
    }

    fn validate(&self) -> Result<()> {
        parse_duration_field("idle_interval", &self.idle_interval)?;
        parse_duration_field("burst_interval", &self.burst_interval)?;
        parse_duration_field("retry_delay", &self.retry_delay)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ConnectionSettings: per-replica connection bounds
// ═══════════════════════════════════════════════════════════════════════════════

/// Timeouts and pool lifetimes for each replica connection.
///
/// Every monitor holds a pool capped at a single connection. `max_lifetime`
/// and `idle_timeout` force that connection to be renewed periodically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,

    /// Bound on a status query round trip.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: String,

    /// Added to `read_timeout` to bound a remediation batch round trip.
    #[serde(default = "default_write_timeout")]
    pub write_timeout: String,

    #[serde(default = "default_max_lifetime")]
    pub max_lifetime: String,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: String,
}

fn default_connect_timeout() -> String {
    "10s".to_string()
}

fn default_read_timeout() -> String {
    "30s".to_string()
}

fn default_write_timeout() -> String {
    "10s".to_string()
}

fn default_max_lifetime() -> String {
    "5m".to_string()
}

fn default_idle_timeout() -> String {
    "5m".to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            write_timeout: default_write_timeout(),
            max_lifetime: default_max_lifetime(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

impl ConnectionSettings {
    pub fn connect_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.connect_timeout).unwrap_or(Duration::from_secs(10))
    }

    pub fn read_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.read_timeout).unwrap_or(Duration::from_secs(30))
    }

    pub fn write_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.write_timeout).unwrap_or(Duration::from_secs(10))
    }

    pub fn max_lifetime_duration(&self) -> Duration {
        humantime::parse_duration(&self.max_lifetime).unwrap_or(Duration::from_secs(300))
    }

    pub fn idle_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.idle_timeout).unwrap_or(Duration::from_secs(300))
    }

    fn validate(&self) -> Result<()> {
        parse_duration_field("connect_timeout", &self.connect_timeout)?;
        parse_duration_field("read_timeout", &self.read_timeout)?;
        parse_duration_field("write_timeout", &self.write_timeout)?;
        parse_duration_field("max_lifetime", &self.max_lifetime)?;
        parse_duration_field("idle_timeout", &self.idle_timeout)?;
        Ok(())
    }
}

fn parse_duration_field(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| MonitorError::Config(format!("invalid duration for {}: {:?} ({})", field, value, e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Target: one entry per monitored replica
// ═══════════════════════════════════════════════════════════════════════════════

/// A monitored replica.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Name used as the log prefix. Taken from the table key.
    #[serde(skip)]
    pub name: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Target {
    /// Create a target for testing.
    pub fn for_testing(name: &str, host: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
            username: "root".to_string(),
            password: String::new(),
        }
    }

    /// `host:port`, for log fields.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(MonitorError::Config(format!("target [{}] has an empty host", self.name)));
        }
        if self.username.trim().is_empty() {
            return Err(MonitorError::Config(format!("target [{}] has an empty username", self.name)));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WatchdogConfig: everything loaded from the config file
// ═══════════════════════════════════════════════════════════════════════════════

/// The `[defaults]` table: global tunables, intervals and connection settings
/// share one flat namespace.
#[derive(Debug, Default, Deserialize)]
struct DefaultsSection {
    #[serde(flatten)]
    global: GlobalConfig,
    #[serde(flatten)]
    intervals: PollIntervals,
    #[serde(flatten)]
    connection: ConnectionSettings,
}

/// The fully loaded, validated configuration.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub global: GlobalConfig,
    pub intervals: PollIntervals,
    pub connection: ConnectionSettings,
    /// Targets in file order. Never empty once validated.
    pub targets: Vec<Target>,
}

impl WatchdogConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MonitorError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config file contents.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse()?;

        let mut defaults = DefaultsSection::default();
        let mut targets = Vec::new();

        for (name, value) in table {
            if !value.is_table() {
                return Err(MonitorError::Config(format!(
                    "top-level key '{}' must be a table",
                    name
                )));
            }
            if name == DEFAULTS_SECTION {
                defaults = value.try_into()?;
                continue;
            }
            let mut target: Target = value.try_into()?;
            target.name = name;
            targets.push(target);
        }

        let config = Self {
            global: defaults.global,
            intervals: defaults.intervals,
            connection: defaults.connection,
            targets,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the monitors rely on.
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(MonitorError::Config("no targets defined in config file".to_string()));
        }
        for target in &self.targets {
            target.validate()?;
        }
        self.intervals.validate()?;
        self.connection.validate()?;
        Ok(())
    }
}
