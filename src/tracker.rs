// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-replica running state.

use crate::backoff::Backoff;
use crate::indicator::RateWindow;
use crate::sequence::ErrorSequence;
use tokio::time::Instant;

/// All mutable state of one monitor.
///
/// Owned by exactly one [`TargetMonitor`](crate::monitor::TargetMonitor) and
/// moved into its task; never shared, so it needs no synchronization.
#[derive(Debug, Clone)]
pub struct LagTracker {
    /// Previous read/exec positions and poll time, for rate computation.
    pub rate: RateWindow,
    pub backoff: Backoff,
    pub errors: ErrorSequence,
    /// Whether the monitor has seen at least one status.
    pub observed: bool,
}

impl LagTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            rate: RateWindow::new(now),
            backoff: Backoff::default(),
            errors: ErrorSequence::default(),
            observed: false,
        }
    }

    /// Current backoff in seconds.
    pub fn backoff_seconds(&self) -> u32 {
        self.backoff.seconds
    }

    /// Consecutive healthy polls.
    pub fn zero_err_count(&self) -> u32 {
        self.backoff.zero_err_count
    }

    /// Errno of the episode in progress (0 = none).
    pub fn current_error_code(&self) -> u32 {
        self.errors.current_code
    }
}
