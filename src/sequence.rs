// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error-sequence aggregation.
//!
//! A skip or optimize fix-loop can repeat every 25ms for minutes. Instead of
//! one line per poll, consecutive polls with the same remediable errno form
//! an episode: the first poll is logged in full, repeats are counted
//! silently, and the episode is closed with a single summary line.
//!
//! ```text
//! errno:  0   1062 1062 1062  0
//! log:        full  -    -    "Fixed 2 more errno=1062 problems (took 0s)"
//! ```

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Result of recording one remediable errno.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceStep {
    /// A new episode began. Carries the summary of the episode it replaced,
    /// if that one had repeats worth reporting.
    Started { closed: Option<SequenceSummary> },
    /// Same errno as the previous poll.
    Repeated { count: u32 },
}

/// Closing report for an episode with more than one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSummary {
    pub errno: u32,
    /// Occurrences after the first (the first was logged in full).
    pub additional: u32,
    /// Episode duration. Only reported when the episode ends in a clean poll.
    pub took: Option<Duration>,
}

impl fmt::Display for SequenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed {} more errno={} problems", self.additional, self.errno)?;
        if let Some(took) = self.took {
            write!(f, " (took {})", format_took(took))?;
        }
        Ok(())
    }
}

/// Whole seconds, `1h2m3s` style: leading zero units dropped, inner ones kept.
fn format_took(took: Duration) -> String {
    let secs = took.as_secs_f64().round() as u64;
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Episode state for one replica.
#[derive(Debug, Clone, Default)]
pub struct ErrorSequence {
    /// Errno of the episode in progress (0 = none).
    pub current_code: u32,
    /// Occurrences of `current_code` so far.
    pub count: u32,
    /// When the episode started.
    pub started_at: Option<Instant>,
    /// Episodes started since the monitor began.
    pub episode: u64,
}

impl ErrorSequence {
    /// Record a poll showing remediable `errno`.
    pub fn record(&mut self, errno: u32, now: Instant) -> SequenceStep {
        if errno == self.current_code && self.count > 0 {
            self.count = self.count.saturating_add(1);
            return SequenceStep::Repeated { count: self.count };
        }

        let closed = self.summary(None);
        self.current_code = errno;
        self.count = 1;
        self.started_at = Some(now);
        self.episode += 1;
        SequenceStep::Started { closed }
    }

    /// Record an error-free poll. Closes the episode in progress, if any.
    pub fn clear(&mut self, now: Instant) -> Option<SequenceSummary> {
        if !self.in_progress() {
            return None;
        }
        let took = self
            .started_at
            .map(|started| now.saturating_duration_since(started));
        let summary = self.summary(took);

        self.current_code = 0;
        self.count = 0;
        self.started_at = None;
        summary
    }

    pub fn in_progress(&self) -> bool {
        self.current_code != 0
    }

    fn summary(&self, took: Option<Duration>) -> Option<SequenceSummary> {
        if self.count > 1 {
            Some(SequenceSummary {
                errno: self.current_code,
                additional: self.count - 1,
                took,
            })
        } else {
            None
        }
    }
}
