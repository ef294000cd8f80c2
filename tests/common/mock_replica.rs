//! Mock ReplicaConnection for testing.
//!
//! Replays a script of status reads, records every remediation batch and
//! ping, and can be told to fail batches or pings.

use replica_watchdog::error::MonitorError;
use replica_watchdog::replica::{BoxFuture, ReplicaConnection};
use replica_watchdog::status::SlaveStatus;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One scripted `SHOW SLAVE STATUS` result.
#[derive(Debug, Clone)]
pub enum StatusStep {
    Status(SlaveStatus),
    /// The read fails with a connection error carrying this message.
    Fail(String),
}

#[derive(Default)]
struct Inner {
    /// Remaining script. The last step repeats forever.
    script: RwLock<VecDeque<StatusStep>>,
    /// Recorded execute_batch() calls
    batches: RwLock<Vec<String>>,
    /// Number of upcoming batches that fail
    failing_batches: AtomicUsize,
    ping_fails: AtomicBool,
    pings: AtomicUsize,
    status_reads: AtomicUsize,
}

/// Scripted replica. Clones share state, so a test can keep a handle after
/// moving one into a monitor.
///
/// # Example
/// ```rust,ignore
/// let mock = MockReplica::with_statuses([errno(1062), caught_up()]);
/// let mut monitor = monitor_for(mock.clone());
///
/// monitor.poll_once().await;
/// assert_eq!(mock.batches().await.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockReplica {
    inner: Arc<Inner>,
}

impl MockReplica {
    /// A replica that is always caught up.
    pub fn new() -> Self {
        Self::with_statuses([caught_up()])
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = SlaveStatus>) -> Self {
        let script = statuses.into_iter().map(StatusStep::Status).collect();
        Self {
            inner: Arc::new(Inner {
                script: RwLock::new(script),
                ..Default::default()
            }),
        }
    }

    /// Append a status to the script.
    pub async fn push_status(&self, status: SlaveStatus) {
        self.inner.script.write().await.push_back(StatusStep::Status(status));
    }

    /// Append a failing status read to the script.
    pub async fn push_failure(&self, message: &str) {
        self.inner
            .script
            .write()
            .await
            .push_back(StatusStep::Fail(message.to_string()));
    }

    /// Make the next `n` batches fail.
    pub fn fail_next_batches(&self, n: usize) {
        self.inner.failing_batches.store(n, Ordering::SeqCst);
    }

    pub fn set_ping_fails(&self, fails: bool) {
        self.inner.ping_fails.store(fails, Ordering::SeqCst);
    }

    /// Batches executed so far, including failed ones.
    pub async fn batches(&self) -> Vec<String> {
        self.inner.batches.read().await.clone()
    }

    pub fn ping_count(&self) -> usize {
        self.inner.pings.load(Ordering::SeqCst)
    }

    pub fn status_reads(&self) -> usize {
        self.inner.status_reads.load(Ordering::SeqCst)
    }

    async fn next_step(&self) -> StatusStep {
        let mut script = self.inner.script.write().await;
        if script.len() > 1 {
            script.pop_front().unwrap_or_else(|| StatusStep::Status(SlaveStatus::default()))
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| StatusStep::Status(SlaveStatus::default()))
        }
    }
}

impl ReplicaConnection for MockReplica {
    fn slave_status(&self) -> BoxFuture<'_, SlaveStatus> {
        Box::pin(async move {
            self.inner.status_reads.fetch_add(1, Ordering::SeqCst);
            match self.next_step().await {
                StatusStep::Status(status) => Ok(status),
                StatusStep::Fail(message) => Err(MonitorError::Connection {
                    target: "mock".to_string(),
                    message,
                }),
            }
        })
    }

    fn execute_batch(&self, batch: String) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.inner.batches.write().await.push(batch);

            let failing = self.inner.failing_batches.load(Ordering::SeqCst);
            if failing > 0 {
                self.inner.failing_batches.store(failing - 1, Ordering::SeqCst);
                return Err(MonitorError::Connection {
                    target: "mock".to_string(),
                    message: "Lost connection to server during query".to_string(),
                });
            }
            Ok(())
        })
    }

    fn ping(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.inner.pings.fetch_add(1, Ordering::SeqCst);
            if self.inner.ping_fails.load(Ordering::SeqCst) {
                return Err(MonitorError::Connection {
                    target: "mock".to_string(),
                    message: "ping failed".to_string(),
                });
            }
            Ok(())
        })
    }
}

// =============================================================================
// Status Helpers
// =============================================================================

/// Caught up at position 1000, no error.
pub fn caught_up() -> SlaveStatus {
    SlaveStatus {
        errno: 0,
        read_master_log_pos: 1_000,
        exec_master_log_pos: 1_000,
        seconds_behind_master: 0,
    }
}

/// Caught up at position 1000 with the given SQL errno.
pub fn errno(code: u32) -> SlaveStatus {
    SlaveStatus {
        errno: code,
        ..caught_up()
    }
}

pub fn positions(read: i64, exec: i64) -> SlaveStatus {
    SlaveStatus {
        read_master_log_pos: read,
        exec_master_log_pos: exec,
        ..Default::default()
    }
}
