// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Poll outcomes and monitor events.
//!
//! Every line a monitor logs is a [`MonitorEvent`]. Its `Display` is the log
//! body, so the line format lives in one place and tests can assert on the
//! exact text without capturing log output.
//!
//! # Burst Loop
//!
//! ```text
//!            ┌──────── Remediated: sleep burst_interval ───────┐
//!            ↓                                                 │
//!   ──→ poll_once ─────────────────────────────────────────────┘
//!            │
//!            ├── Settled: end cycle
//!            └── Failed:  sleep retry_delay, end cycle
//!
//!   end cycle: sleep backoff (whole seconds) or idle_interval
//! ```

use crate::indicator::Indicator;
use crate::remediation::Action;
use crate::sequence::SequenceSummary;
use std::fmt;

/// How a single poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A remediation ran successfully. Poll again after the burst interval.
    Remediated(Action),
    /// Nothing to fix. The cycle ends.
    Settled,
    /// Reading status or running a remediation failed. The cycle ends after
    /// the retry delay.
    Failed,
}

/// One loggable event.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Startup connection and ping succeeded.
    Connected,
    /// First status was all zeros. Either replication is not configured or
    /// the replica is at position 0.
    ReplicationNotConfigured,
    /// Exec position ahead of read position; about to reset.
    PositionReset {
        errno: u32,
        indicator: Indicator,
        backoff: u32,
    },
    PositionResetDone { master_log_pos: u64 },
    /// Opening line of a skip/optimize episode.
    Remediating {
        errno: u32,
        indicator: Indicator,
        action: Action,
        backoff: u32,
    },
    RemediationFailed {
        errno: u32,
        indicator: Indicator,
        action: Action,
        backoff: u32,
        error: String,
    },
    /// Nonzero errno with no known fix.
    Unremediated {
        errno: u32,
        indicator: Indicator,
        backoff: u32,
    },
    /// Episode replaced by a different errno.
    SequenceReplaced(SequenceSummary),
    /// Episode ended in an error-free poll.
    SequenceCleared {
        summary: SequenceSummary,
        indicator: Indicator,
    },
    BackedOff(u32),
    BackoffReset,
    StatusFailed(String),
    /// Ping failed after a status read error.
    Reconnecting,
    /// Ping failed after a remediation error.
    ConnectionLost,
}

impl MonitorEvent {
    /// Whether this event should be logged at warn level or above.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            MonitorEvent::ReplicationNotConfigured
                | MonitorEvent::RemediationFailed { .. }
                | MonitorEvent::Unremediated { .. }
                | MonitorEvent::StatusFailed(_)
                | MonitorEvent::Reconnecting
                | MonitorEvent::ConnectionLost
        )
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEvent::Connected => {
                write!(f, "Connected to MariaDB, monitoring replication status...")
            }
            MonitorEvent::ReplicationNotConfigured => write!(
                f,
                "SHOW SLAVE STATUS returned no replication positions; is replication configured?"
            ),
            MonitorEvent::PositionReset {
                errno,
                indicator,
                backoff,
            } => write!(
                f,
                "errno={} {} action=reset_position backoff={}s (Exec_Master_Log_Pos > Read_Master_Log_Pos)",
                errno, indicator, backoff
            ),
            MonitorEvent::PositionResetDone { master_log_pos } => {
                write!(f, "Master log position reset to {}", master_log_pos)
            }
            MonitorEvent::Remediating {
                errno,
                indicator,
                action,
                backoff,
            } => write!(
                f,
                "errno={} {} action={} backoff={}s",
                errno, indicator, action, backoff
            ),
            MonitorEvent::RemediationFailed {
                action: Action::ResetPosition,
                error,
                ..
            } => write!(f, "Failed to reset master log position: {}", error),
            MonitorEvent::RemediationFailed {
                errno,
                indicator,
                action,
                backoff,
                error,
            } => write!(
                f,
                "errno={} {} action={} backoff={}s error={}",
                errno, indicator, action, backoff, error
            ),
            MonitorEvent::Unremediated {
                errno,
                indicator,
                backoff,
            } => write!(f, "errno={} {} action=none backoff={}s", errno, indicator, backoff),
            MonitorEvent::SequenceReplaced(summary) => write!(f, "{}", summary),
            MonitorEvent::SequenceCleared { summary, indicator } => {
                write!(f, "{} {}", summary, indicator)
            }
            MonitorEvent::BackedOff(seconds) => {
                write!(f, "No errors detected, backed off to {}s", seconds)
            }
            MonitorEvent::BackoffReset => write!(f, "Error detected, resetting backoff"),
            MonitorEvent::StatusFailed(error) => write!(f, "Error checking replication: {}", error),
            MonitorEvent::Reconnecting => write!(f, "Connection lost, reconnecting..."),
            MonitorEvent::ConnectionLost => write!(f, "Connection lost, will reconnect"),
        }
    }
}

/// Result of one [`poll_once`](super::TargetMonitor::poll_once).
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Events logged during the poll, in order.
    pub events: Vec<MonitorEvent>,
}

impl PollReport {
    /// Rendered log bodies, in order.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }
}
