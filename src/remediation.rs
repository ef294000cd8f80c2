// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remediation dispatch.
//!
//! Maps a status snapshot to at most one corrective action and runs it.
//!
//! | Priority | Condition | Action | Statements |
//! |----------|-----------|--------|------------|
//! | 1 | exec pos > read pos > … (exec > 0) | `reset_position` | `CHANGE MASTER TO master_log_pos=N` |
//! | 2 | errno 1062 (duplicate key) | `skip` | `sql_slave_skip_counter = 1` |
//! | 3 | errno 1942 (parallel apply exhausted) | `optimize` | parallel apply tunables, optimistic mode |
//! | 4 | anything else | `none` | - |
//!
//! Every batch is wrapped in `STOP SLAVE` / `START SLAVE` and sent as one
//! multi-statement round trip. Administrative statements are not
//! transactional: if a statement fails, the ones before it stay applied and
//! the rest are not run.

use crate::config::GlobalConfig;
use crate::error::Result;
use crate::replica::ReplicaConnection;
use crate::status::SlaveStatus;
use std::fmt;

/// Duplicate-key error on the SQL thread.
pub const ERRNO_DUPLICATE_KEY: u32 = 1062;

/// Parallel apply queue exhausted on the SQL thread.
pub const ERRNO_PARALLEL_APPLY_EXHAUSTED: u32 = 1942;

/// The corrective action chosen for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    None,
    /// Skip the one offending transaction.
    Skip,
    /// Retune parallel apply and switch to optimistic mode.
    Optimize,
    /// Point the SQL thread back at the configured log position.
    ResetPosition,
}

impl Action {
    /// Pick the action for a status snapshot. Position mismatch wins over
    /// any errno.
    pub fn classify(status: &SlaveStatus) -> Self {
        if status.has_position_mismatch() {
            return Action::ResetPosition;
        }
        match status.errno {
            ERRNO_DUPLICATE_KEY => Action::Skip,
            ERRNO_PARALLEL_APPLY_EXHAUSTED => Action::Optimize,
            _ => Action::None,
        }
    }

    /// Label used in `action=` log fields and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::Skip => "skip",
            Action::Optimize => "optimize",
            Action::ResetPosition => "reset_position",
        }
    }

    /// Whether this action runs statements against the replica.
    pub fn is_remediation(&self) -> bool {
        !matches!(self, Action::None)
    }

    /// Statement batch for this action, or `None` for [`Action::None`].
    pub fn statements(&self, config: &GlobalConfig) -> Option<String> {
        match self {
            Action::None => None,
            Action::Skip => {
                Some("STOP SLAVE; SET global sql_slave_skip_counter = 1; START SLAVE".to_string())
            }
            Action::Optimize => Some(format!(
                "STOP SLAVE; SET GLOBAL slave_parallel_max_queued = {}; SET GLOBAL slave_parallel_threads = {}; SET GLOBAL slave_domain_parallel_threads = {}; SET GLOBAL slave_parallel_mode = 'optimistic'; START SLAVE;",
                config.slave_parallel_max_queued,
                config.slave_parallel_threads,
                config.slave_domain_parallel_threads
            )),
            Action::ResetPosition => Some(format!(
                "STOP SLAVE; CHANGE MASTER TO master_log_pos={}; START SLAVE",
                config.master_log_pos
            )),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the statements for `action` against the replica.
///
/// [`Action::None`] is a no-op.
pub async fn dispatch<C: ReplicaConnection + ?Sized>(
    conn: &C,
    action: Action,
    config: &GlobalConfig,
) -> Result<()> {
    match action.statements(config) {
        Some(batch) => conn.execute_batch(batch).await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(errno: u32, read: i64, exec: i64) -> SlaveStatus {
        SlaveStatus {
            errno,
            read_master_log_pos: read,
            exec_master_log_pos: exec,
            seconds_behind_master: 0,
        }
    }

    #[test]
    fn test_classify_by_errno() {
        assert_eq!(Action::classify(&status(0, 100, 100)), Action::None);
        assert_eq!(Action::classify(&status(1062, 100, 100)), Action::Skip);
        assert_eq!(Action::classify(&status(1942, 100, 100)), Action::Optimize);
        assert_eq!(Action::classify(&status(1146, 100, 100)), Action::None);
    }

    #[test]
    fn test_position_mismatch_outranks_errno() {
        assert_eq!(Action::classify(&status(1062, 100, 500)), Action::ResetPosition);
        assert_eq!(Action::classify(&status(1942, 100, 500)), Action::ResetPosition);
        assert_eq!(Action::classify(&status(0, 100, 500)), Action::ResetPosition);
    }

    #[test]
    fn test_exec_ahead_of_unset_read_is_mismatch() {
        assert_eq!(Action::classify(&status(0, 0, 10)), Action::ResetPosition);
        assert_eq!(Action::classify(&status(0, 0, 0)), Action::None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Action::None.to_string(), "none");
        assert_eq!(Action::Skip.to_string(), "skip");
        assert_eq!(Action::Optimize.to_string(), "optimize");
        assert_eq!(Action::ResetPosition.to_string(), "reset_position");
        assert!(!Action::None.is_remediation());
        assert!(Action::Skip.is_remediation());
    }

    #[test]
    fn test_reset_statements_use_configured_position() {
        let config = GlobalConfig {
            master_log_pos: 1_234,
            ..Default::default()
        };
        assert_eq!(
            Action::ResetPosition.statements(&config).unwrap(),
            "STOP SLAVE; CHANGE MASTER TO master_log_pos=1234; START SLAVE"
        );
    }

    #[test]
    fn test_skip_statements() {
        assert_eq!(
            Action::Skip.statements(&GlobalConfig::default()).unwrap(),
            "STOP SLAVE; SET global sql_slave_skip_counter = 1; START SLAVE"
        );
    }

    #[test]
    fn test_optimize_statements_use_config() {
        let batch = Action::Optimize.statements(&GlobalConfig::default()).unwrap();
        assert!(batch.starts_with("STOP SLAVE;"));
        assert!(batch.contains("SET GLOBAL slave_parallel_max_queued = 262144;"));
        assert!(batch.contains("SET GLOBAL slave_parallel_threads = 3;"));
        assert!(batch.contains("SET GLOBAL slave_domain_parallel_threads = 2;"));
        assert!(batch.contains("SET GLOBAL slave_parallel_mode = 'optimistic';"));
        assert!(batch.ends_with("START SLAVE;"));
    }

    #[test]
    fn test_none_has_no_statements() {
        assert_eq!(Action::None.statements(&GlobalConfig::default()), None);
    }
}
