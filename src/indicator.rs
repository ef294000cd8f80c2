// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lag trend indicator.
//!
//! Compares the read (IO thread) and exec (SQL thread) binlog positions
//! between two polls to tell whether the replica is gaining on its master.
//!
//! ```text
//! lag       = read_pos - exec_pos
//! read_rate = Δread_pos / Δt
//! exec_rate = Δexec_pos / Δt
//!
//! lag == 0               → ✓ caught up
//! exec_rate > read_rate  → ↑ catching up
//! exec_rate < read_rate  → ↓ falling behind
//! otherwise              → → stable
//! ```
//!
//! On the first observation, or when polls are closer together than
//! [`MIN_RATE_WINDOW`], rates are not computed and only the raw lag is shown.

use crate::status::SlaveStatus;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Shortest window over which rates are meaningful.
pub const MIN_RATE_WINDOW: Duration = Duration::from_millis(100);

/// Trend classification for one poll. Renders as the log indicator string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Read and exec positions are equal.
    CaughtUp,
    /// Exec is advancing faster than read.
    CatchingUp { lag: i64 },
    /// Read is advancing faster than exec.
    FallingBehind { lag: i64 },
    /// Both advance at the same rate with a nonzero lag.
    Stable { lag: i64 },
    /// Lag is known but there is no rate window yet.
    Lag { lag: i64 },
}

impl Indicator {
    /// Lag in bytes (0 when caught up).
    pub fn lag(&self) -> i64 {
        match *self {
            Indicator::CaughtUp => 0,
            Indicator::CatchingUp { lag }
            | Indicator::FallingBehind { lag }
            | Indicator::Stable { lag }
            | Indicator::Lag { lag } => lag,
        }
    }

    /// Whether this classification came from a rate comparison.
    pub fn has_trend(&self) -> bool {
        !matches!(self, Indicator::Lag { .. })
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::CaughtUp => write!(f, "✓ (caught up)"),
            Indicator::CatchingUp { lag } => write!(f, "↑ (catching up, lag: {} bytes)", lag),
            Indicator::FallingBehind { lag } => write!(f, "↓ (falling behind, lag: {} bytes)", lag),
            Indicator::Stable { lag } => write!(f, "→ (stable, lag: {} bytes)", lag),
            Indicator::Lag { lag } => write!(f, "lag: {} bytes", lag),
        }
    }
}

/// Positions and time of the previous poll.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub last_read_pos: i64,
    pub last_exec_pos: i64,
    pub last_check: Instant,
}

impl RateWindow {
    /// Start an empty window. `last_read_pos == 0` marks "no observation yet".
    pub fn new(now: Instant) -> Self {
        Self {
            last_read_pos: 0,
            last_exec_pos: 0,
            last_check: now,
        }
    }

    /// Classify `status` against the previous poll and slide the window.
    pub fn observe(&mut self, status: &SlaveStatus, now: Instant) -> Indicator {
        let current_lag = status.lag_bytes();
        let elapsed = now.saturating_duration_since(self.last_check);
        let first = self.last_read_pos == 0;

        let previous = *self;
        self.last_read_pos = status.read_master_log_pos;
        self.last_exec_pos = status.exec_master_log_pos;
        self.last_check = now;

        if first || elapsed < MIN_RATE_WINDOW {
            return if current_lag == 0 {
                Indicator::CaughtUp
            } else {
                Indicator::Lag { lag: current_lag }
            };
        }

        let secs = elapsed.as_secs_f64();
        let read_rate = status.read_master_log_pos.saturating_sub(previous.last_read_pos) as f64 / secs;
        let exec_rate = status.exec_master_log_pos.saturating_sub(previous.last_exec_pos) as f64 / secs;

        classify(current_lag, read_rate, exec_rate)
    }
}

/// Pure trend classification. Equal rates resolve to stable.
pub fn classify(lag: i64, read_rate: f64, exec_rate: f64) -> Indicator {
    if lag == 0 {
        Indicator::CaughtUp
    } else if exec_rate > read_rate {
        Indicator::CatchingUp { lag }
    } else if exec_rate < read_rate {
        Indicator::FallingBehind { lag }
    } else {
        Indicator::Stable { lag }
    }
}
