// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Adaptive poll backoff.
//!
//! A healthy replica does not need to be polled twice a second. After
//! `backoff_success_count` consecutive healthy polls the sleep between cycles
//! grows by one second per further healthy poll, up to `max_backoff_seconds`.
//!
//! ```text
//!                healthy poll (count >= threshold)
//!          ┌───────────────────────────────────────┐
//!          │                                       ↓
//!   backoff = n ─── healthy ──→ backoff = min(n + 1, ceiling)
//!          ↑
//!          │ error or remediation: backoff = 0, count = 0
//!          │ falling behind:       count = 0, backoff kept
//! ```
//!
//! There is no explicit decrement. The only way down from the ceiling is an
//! error or a remediation, both of which drop straight to 0.

use crate::config::{GlobalConfig, PollIntervals};
use std::time::Duration;

/// Backoff state for one replica.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backoff {
    /// Consecutive healthy error-free polls.
    pub zero_err_count: u32,
    /// Current sleep between outer cycles, in seconds. 0 = not backed off.
    pub seconds: u32,
    /// `Seconds_Behind_Master` from the previous error-free poll.
    pub last_seconds_behind: i64,
}

impl Backoff {
    /// A remediation is about to run: resume tight polling immediately.
    pub fn reset_for_action(&mut self) {
        self.zero_err_count = 0;
        self.seconds = 0;
    }

    /// A nonzero errno with no remediation.
    ///
    /// Returns `true` if the replica was backed off, i.e. the reset is worth
    /// logging.
    pub fn reset_for_error(&mut self) -> bool {
        self.zero_err_count = 0;
        let was_backed_off = self.seconds > 0;
        self.seconds = 0;
        was_backed_off
    }

    /// An error-free poll.
    ///
    /// Healthy means caught up (`seconds_behind == 0`) or progressing (the
    /// previous value was known and positive and this one is not larger).
    /// Returns the new backoff when it is a value worth logging: 1, a
    /// multiple of 5, or the ceiling. A replica held at the ceiling reports
    /// it on every healthy poll.
    pub fn record_clean(&mut self, seconds_behind: i64, config: &GlobalConfig) -> Option<u32> {
        let caught_up = seconds_behind == 0;
        let progressing = self.last_seconds_behind > 0 && seconds_behind <= self.last_seconds_behind;
        self.last_seconds_behind = seconds_behind;

        if !(caught_up || progressing) {
            // Falling behind: start counting again but keep the current sleep.
            self.zero_err_count = 0;
            return None;
        }

        self.zero_err_count = self.zero_err_count.saturating_add(1);
        if self.zero_err_count < config.backoff_success_count {
            return None;
        }

        let ceiling = config.max_backoff_seconds;
        self.seconds = self.seconds.saturating_add(1).min(ceiling);

        if is_milestone(self.seconds, ceiling) {
            Some(self.seconds)
        } else {
            None
        }
    }

    /// Whether polling is currently slowed down.
    pub fn is_backed_off(&self) -> bool {
        self.seconds > 0
    }

    /// Sleep to apply after an outer poll cycle.
    pub fn sleep_interval(&self, intervals: &PollIntervals) -> Duration {
        if self.seconds > 0 {
            Duration::from_secs(u64::from(self.seconds))
        } else {
            intervals.idle_interval_duration()
        }
    }
}

fn is_milestone(seconds: u32, ceiling: u32) -> bool {
    seconds == 1 || seconds % 5 == 0 || seconds == ceiling
}
