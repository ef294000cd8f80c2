// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-replica monitor.
//!
//! Ties together:
//! - Status reads via [`crate::replica::ReplicaConnection`]
//! - Trend classification via [`crate::indicator`]
//! - Remediation via [`crate::remediation`]
//! - Episode aggregation via [`crate::sequence`]
//! - Poll pacing via [`crate::backoff`]
//!
//! # Architecture
//!
//! One [`TargetMonitor`] per replica, each moved into its own task by
//! [`TargetMonitor::spawn`]. A monitor exclusively owns its connection and
//! its [`LagTracker`]; monitors share nothing but the read-only
//! [`GlobalConfig`]. Within a monitor every step is sequential:
//!
//! 1. Read `SHOW SLAVE STATUS`
//! 2. Classify the trend and pick an action
//! 3. Run the action, or update backoff if there is nothing to fix
//! 4. Poll again after the burst interval while remediations keep running
//! 5. Sleep for the backoff (or idle interval) and start over

mod supervisor;
mod types;

pub use supervisor::run_all;
pub use types::{MonitorEvent, PollOutcome, PollReport};

use crate::config::{GlobalConfig, PollIntervals};
use crate::indicator::Indicator;
use crate::metrics;
use crate::remediation::{self, Action};
use crate::replica::ReplicaConnection;
use crate::sequence::SequenceStep;
use crate::status::SlaveStatus;
use crate::tracker::LagTracker;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Totals for one outer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    /// Polls made in the cycle (always at least 1).
    pub polls: u32,
    /// Successful remediations in the cycle.
    pub remediations: u32,
    /// Outcome of the poll that ended the cycle.
    pub last_outcome: PollOutcome,
}

/// Monitors one replica forever.
pub struct TargetMonitor<C: ReplicaConnection> {
    name: String,
    conn: C,
    config: Arc<GlobalConfig>,
    intervals: PollIntervals,
    tracker: LagTracker,
}

impl<C: ReplicaConnection> TargetMonitor<C> {
    pub fn new(
        name: impl Into<String>,
        conn: C,
        config: Arc<GlobalConfig>,
        intervals: PollIntervals,
    ) -> Self {
        Self {
            name: name.into(),
            conn,
            config,
            intervals,
            tracker: LagTracker::new(Instant::now()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Running state (for inspection in tests and diagnostics).
    pub fn tracker(&self) -> &LagTracker {
        &self.tracker
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Move the monitor into its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll forever.
    pub async fn run(mut self) {
        let mut events = Vec::new();
        self.emit(&mut events, MonitorEvent::Connected);

        loop {
            self.run_cycle().await;
        }
    }

    /// One outer cycle: poll until nothing is left to fix, then sleep.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let mut polls = 0u32;
        let mut remediations = 0u32;

        let last_outcome = loop {
            let report = self.poll_once().await;
            polls = polls.saturating_add(1);

            match report.outcome {
                PollOutcome::Remediated(_) => {
                    remediations = remediations.saturating_add(1);
                    sleep(self.intervals.burst_interval_duration()).await;
                }
                PollOutcome::Settled => break report.outcome,
                PollOutcome::Failed => {
                    sleep(self.intervals.retry_delay_duration()).await;
                    break report.outcome;
                }
            }
        };

        let pause = self.tracker.backoff.sleep_interval(&self.intervals);
        debug!(replica = %self.name, polls, remediations, pause_ms = pause.as_millis() as u64, "Cycle complete");
        sleep(pause).await;

        CycleSummary {
            polls,
            remediations,
            last_outcome,
        }
    }

    /// Read status once and react to it. Does not sleep.
    pub async fn poll_once(&mut self) -> PollReport {
        let mut events = Vec::new();
        let outcome = self.poll(&mut events).await;
        metrics::set_backoff_seconds(&self.name, self.tracker.backoff_seconds());
        PollReport { outcome, events }
    }

    async fn poll(&mut self, events: &mut Vec<MonitorEvent>) -> PollOutcome {
        metrics::record_poll(&self.name);

        let status = match self.conn.slave_status().await {
            Ok(status) => status,
            Err(e) => {
                metrics::record_status_error(&self.name);
                self.emit(events, MonitorEvent::StatusFailed(e.to_string()));
                self.check_connection(MonitorEvent::Reconnecting, events).await;
                return PollOutcome::Failed;
            }
        };

        let now = Instant::now();
        if !self.tracker.observed {
            self.tracker.observed = true;
            if status.is_all_zero() {
                self.emit(events, MonitorEvent::ReplicationNotConfigured);
            }
        }

        let indicator = self.tracker.rate.observe(&status, now);
        metrics::set_lag_bytes(&self.name, status.lag_bytes());
        metrics::set_seconds_behind(&self.name, status.seconds_behind_master);

        match Action::classify(&status) {
            Action::ResetPosition => {
                // Logged with the backoff in force before the reset.
                let event = MonitorEvent::PositionReset {
                    errno: status.errno,
                    indicator,
                    backoff: self.tracker.backoff_seconds(),
                };
                self.emit(events, event);
                self.tracker.backoff.reset_for_action();

                let outcome = self.apply(Action::ResetPosition, &status, indicator, events).await;
                if outcome != PollOutcome::Failed {
                    let event = MonitorEvent::PositionResetDone {
                        master_log_pos: self.config.master_log_pos,
                    };
                    self.emit(events, event);
                }
                outcome
            }
            action @ (Action::Skip | Action::Optimize) => {
                self.tracker.backoff.reset_for_action();
                self.track_episode(action, &status, indicator, now, events);
                self.apply(action, &status, indicator, events).await
            }
            Action::None => {
                self.settle(&status, indicator, now, events);
                PollOutcome::Settled
            }
        }
    }

    /// Count a skip/optimize errno into its episode; log only the opening poll.
    fn track_episode(
        &mut self,
        action: Action,
        status: &SlaveStatus,
        indicator: Indicator,
        now: Instant,
        events: &mut Vec<MonitorEvent>,
    ) {
        match self.tracker.errors.record(status.errno, now) {
            SequenceStep::Started { closed } => {
                if let Some(summary) = closed {
                    self.emit(events, MonitorEvent::SequenceReplaced(summary));
                }
                metrics::record_error_episode(&self.name, status.errno);

                let event = MonitorEvent::Remediating {
                    errno: status.errno,
                    indicator,
                    action,
                    backoff: self.tracker.backoff_seconds(),
                };
                self.emit(events, event);
            }
            SequenceStep::Repeated { count } => {
                debug!(replica = %self.name, errno = status.errno, count, "Repeated replication error");
            }
        }
    }

    /// No remediation applies: update backoff and close any finished episode.
    fn settle(
        &mut self,
        status: &SlaveStatus,
        indicator: Indicator,
        now: Instant,
        events: &mut Vec<MonitorEvent>,
    ) {
        if status.errno != 0 {
            let event = MonitorEvent::Unremediated {
                errno: status.errno,
                indicator,
                backoff: self.tracker.backoff_seconds(),
            };
            self.emit(events, event);
            if self.tracker.backoff.reset_for_error() {
                self.emit(events, MonitorEvent::BackoffReset);
            }
            return;
        }

        if let Some(summary) = self.tracker.errors.clear(now) {
            self.emit(events, MonitorEvent::SequenceCleared { summary, indicator });
        }
        if let Some(seconds) = self
            .tracker
            .backoff
            .record_clean(status.seconds_behind_master, &self.config)
        {
            self.emit(events, MonitorEvent::BackedOff(seconds));
        }
    }

    async fn apply(
        &mut self,
        action: Action,
        status: &SlaveStatus,
        indicator: Indicator,
        events: &mut Vec<MonitorEvent>,
    ) -> PollOutcome {
        match remediation::dispatch(&self.conn, action, &self.config).await {
            Ok(()) => {
                metrics::record_remediation(&self.name, action.as_str(), true);
                PollOutcome::Remediated(action)
            }
            Err(e) => {
                metrics::record_remediation(&self.name, action.as_str(), false);
                let event = MonitorEvent::RemediationFailed {
                    errno: status.errno,
                    indicator,
                    action,
                    backoff: self.tracker.backoff_seconds(),
                    error: e.to_string(),
                };
                self.emit(events, event);
                self.check_connection(MonitorEvent::ConnectionLost, events).await;
                PollOutcome::Failed
            }
        }
    }

    /// Ping after a failure and log `lost` if the connection is gone. The
    /// pool reconnects on the next acquire.
    async fn check_connection(&self, lost: MonitorEvent, events: &mut Vec<MonitorEvent>) {
        if let Err(e) = self.conn.ping().await {
            debug!(replica = %self.name, error = %e, "Ping failed");
            self.emit(events, lost);
        }
    }

    fn emit(&self, events: &mut Vec<MonitorEvent>, event: MonitorEvent) {
        if event.is_warning() {
            warn!(replica = %self.name, "{}", event);
        } else {
            info!(replica = %self.name, "{}", event);
        }
        events.push(event);
    }
}
