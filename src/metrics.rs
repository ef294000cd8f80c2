// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Emits through the `metrics` facade; installing an exporter is left to the
//! embedding process. Without a recorder every call is a no-op.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replica_` and labelled with `replica`:
//! - Counters end in `_total`
//! - Gauges represent the state at the latest poll
//!
//! # Usage
//!
//! ```rust,no_run
//! use replica_watchdog::metrics;
//!
//! metrics::record_poll("db1");
//! metrics::record_remediation("db1", "skip", true);
//! metrics::set_backoff_seconds("db1", 5);
//! ```

use metrics::{counter, gauge};

/// Record one status poll.
pub fn record_poll(replica: &str) {
    counter!("replica_polls_total", "replica" => replica.to_string()).increment(1);
}

/// Record a failed `SHOW SLAVE STATUS`.
pub fn record_status_error(replica: &str) {
    counter!("replica_status_errors_total", "replica" => replica.to_string()).increment(1);
}

/// Record a remediation attempt by action label and outcome.
pub fn record_remediation(replica: &str, action: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "replica_remediations_total",
        "replica" => replica.to_string(),
        "action" => action.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record the start of a new error episode.
pub fn record_error_episode(replica: &str, errno: u32) {
    counter!(
        "replica_error_episodes_total",
        "replica" => replica.to_string(),
        "errno" => errno.to_string()
    )
    .increment(1);
}

/// Set the current backoff in seconds.
pub fn set_backoff_seconds(replica: &str, seconds: u32) {
    gauge!("replica_backoff_seconds", "replica" => replica.to_string()).set(f64::from(seconds));
}

/// Set the read/exec position gap in bytes. Negative on a position mismatch.
pub fn set_lag_bytes(replica: &str, lag: i64) {
    gauge!("replica_lag_bytes", "replica" => replica.to_string()).set(lag as f64);
}

/// Set `Seconds_Behind_Master` as last reported.
pub fn set_seconds_behind(replica: &str, seconds: i64) {
    gauge!("replica_seconds_behind_master", "replica" => replica.to_string()).set(seconds as f64);
}
