// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication status reader.
//!
//! Runs `SHOW SLAVE STATUS` and pulls out the four numbers the monitor acts
//! on. The result set has dozens of columns whose order and presence vary
//! between server versions, so columns are located by name and everything
//! else is left undecoded.
//!
//! | Column | Required | Field |
//! |--------|----------|-------|
//! | `Last_SQL_Errno` | yes | [`SlaveStatus::errno`] |
//! | `Read_Master_Log_Pos` | no | [`SlaveStatus::read_master_log_pos`] |
//! | `Exec_Master_Log_Pos` | no | [`SlaveStatus::exec_master_log_pos`] |
//! | `Seconds_Behind_Master` | no | [`SlaveStatus::seconds_behind_master`] |
//!
//! SQL NULL (e.g. `Seconds_Behind_Master` while the SQL thread is stopped)
//! reads as 0. An empty result set (replication not configured) reads as an
//! all-zero status, which is indistinguishable from a healthy replica that
//! is fully caught up.

use crate::error::{MonitorError, Result};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::{Column, Executor, Row};

/// The replication status query.
pub const SLAVE_STATUS_QUERY: &str = "SHOW SLAVE STATUS";

pub const COL_LAST_SQL_ERRNO: &str = "Last_SQL_Errno";
pub const COL_READ_MASTER_LOG_POS: &str = "Read_Master_Log_Pos";
pub const COL_EXEC_MASTER_LOG_POS: &str = "Exec_Master_Log_Pos";
pub const COL_SECONDS_BEHIND_MASTER: &str = "Seconds_Behind_Master";

/// One replication status snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaveStatus {
    /// Last SQL thread error code (0 = none).
    pub errno: u32,
    /// Position in the master binlog the IO thread has read up to.
    pub read_master_log_pos: i64,
    /// Position in the master binlog the SQL thread has executed up to.
    pub exec_master_log_pos: i64,
    pub seconds_behind_master: i64,
}

impl SlaveStatus {
    /// Bytes read from the master but not yet executed.
    ///
    /// Negative when the executed position is ahead of the read position.
    pub fn lag_bytes(&self) -> i64 {
        self.read_master_log_pos.saturating_sub(self.exec_master_log_pos)
    }

    /// Executed position ahead of the read position: the relay log was
    /// interrupted and the coordinates no longer line up.
    pub fn has_position_mismatch(&self) -> bool {
        self.exec_master_log_pos > self.read_master_log_pos && self.exec_master_log_pos > 0
    }

    /// True for the status produced when no replication row exists.
    ///
    /// A caught-up replica with all positions at zero looks identical.
    pub fn is_all_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Ordinals of the columns we decode, located by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusColumns {
    pub errno: usize,
    pub read_pos: Option<usize>,
    pub exec_pos: Option<usize>,
    pub seconds_behind: Option<usize>,
}

impl StatusColumns {
    /// Locate the status columns in a result set header.
    ///
    /// Fails only when `Last_SQL_Errno` is absent.
    pub fn locate<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut errno = None;
        let mut read_pos = None;
        let mut exec_pos = None;
        let mut seconds_behind = None;

        for (i, name) in names.iter().enumerate() {
            match name.as_ref() {
                COL_LAST_SQL_ERRNO => errno = Some(i),
                COL_READ_MASTER_LOG_POS => read_pos = Some(i),
                COL_EXEC_MASTER_LOG_POS => exec_pos = Some(i),
                COL_SECONDS_BEHIND_MASTER => seconds_behind = Some(i),
                _ => {}
            }
        }

        let errno = errno.ok_or_else(|| {
            MonitorError::Schema(format!("{} column not found", COL_LAST_SQL_ERRNO))
        })?;

        Ok(Self {
            errno,
            read_pos,
            exec_pos,
            seconds_behind,
        })
    }
}

/// Read the replication status over a pool.
pub async fn read_slave_status(pool: &MySqlPool) -> Result<SlaveStatus> {
    // raw_sql goes over the text protocol; SHOW statements are not reliably
    // preparable across server versions. `RawSql::fetch_optional` errors on an
    // empty result, so go through the executor for a real Option.
    let row = Executor::fetch_optional(pool, sqlx::raw_sql(SLAVE_STATUS_QUERY))
        .await
        .map_err(|e| MonitorError::database(SLAVE_STATUS_QUERY, e))?;

    match row {
        Some(row) => decode_status(&row),
        None => Ok(SlaveStatus::default()),
    }
}

/// Column access needed to decode one status row.
pub trait StatusRow {
    fn column_names(&self) -> Vec<&str>;

    /// Integer value at `index`, `None` for SQL NULL.
    fn int_at(&self, index: usize, name: &str) -> Result<Option<i64>>;
}

impl StatusRow for MySqlRow {
    fn column_names(&self) -> Vec<&str> {
        self.columns().iter().map(|c| c.name()).collect()
    }

    fn int_at(&self, index: usize, name: &str) -> Result<Option<i64>> {
        // Unchecked: these columns are UNSIGNED on some servers and
        // VARCHAR-typed text on others; both decode from their text form.
        self.try_get_unchecked(index)
            .map_err(|e| MonitorError::database(format!("decode {}", name), e))
    }
}

/// Decode a status row, touching only the located columns.
///
/// NULL and absent optional columns read as 0. An errno outside the `u32`
/// range reads as 0.
pub fn decode_status<R: StatusRow + ?Sized>(row: &R) -> Result<SlaveStatus> {
    let cols = StatusColumns::locate(&row.column_names())?;

    let errno = int_column(row, Some(cols.errno), COL_LAST_SQL_ERRNO)?;

    Ok(SlaveStatus {
        errno: u32::try_from(errno).unwrap_or(0),
        read_master_log_pos: int_column(row, cols.read_pos, COL_READ_MASTER_LOG_POS)?,
        exec_master_log_pos: int_column(row, cols.exec_pos, COL_EXEC_MASTER_LOG_POS)?,
        seconds_behind_master: int_column(row, cols.seconds_behind, COL_SECONDS_BEHIND_MASTER)?,
    })
}

fn int_column<R: StatusRow + ?Sized>(row: &R, index: Option<usize>, name: &str) -> Result<i64> {
    match index {
        Some(index) => Ok(row.int_at(index, name)?.unwrap_or(0)),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory row of `(column, value)` pairs.
    struct TextRow(Vec<(&'static str, Option<i64>)>);

    impl StatusRow for TextRow {
        fn column_names(&self) -> Vec<&str> {
            self.0.iter().map(|(name, _)| *name).collect()
        }

        fn int_at(&self, index: usize, _name: &str) -> Result<Option<i64>> {
            Ok(self.0[index].1)
        }
    }

    fn mariadb_columns() -> Vec<&'static str> {
        vec![
            "Slave_IO_State",
            "Master_Host",
            "Master_User",
            "Master_Port",
            "Connect_Retry",
            "Master_Log_File",
            "Read_Master_Log_Pos",
            "Relay_Log_File",
            "Relay_Log_Pos",
            "Relay_Master_Log_File",
            "Slave_IO_Running",
            "Slave_SQL_Running",
            "Last_Errno",
            "Last_Error",
            "Skip_Counter",
            "Exec_Master_Log_Pos",
            "Relay_Log_Space",
            "Seconds_Behind_Master",
            "Last_IO_Errno",
            "Last_IO_Error",
            "Last_SQL_Errno",
            "Last_SQL_Error",
            "Gtid_IO_Pos",
        ]
    }

    #[test]
    fn test_locate_finds_columns_by_name() {
        let cols = StatusColumns::locate(&mariadb_columns()).unwrap();
        assert_eq!(cols.errno, 20);
        assert_eq!(cols.read_pos, Some(6));
        assert_eq!(cols.exec_pos, Some(15));
        assert_eq!(cols.seconds_behind, Some(17));
    }

    #[test]
    fn test_locate_ignores_order() {
        let mut names = mariadb_columns();
        names.reverse();
        let cols = StatusColumns::locate(&names).unwrap();
        assert_eq!(names[cols.errno], COL_LAST_SQL_ERRNO);
        assert_eq!(names[cols.read_pos.unwrap()], COL_READ_MASTER_LOG_POS);
    }

    #[test]
    fn test_locate_missing_errno_is_schema_error() {
        let names = vec!["Read_Master_Log_Pos", "Exec_Master_Log_Pos", "Last_Errno"];
        let err = StatusColumns::locate(&names).unwrap_err();
        assert!(matches!(err, MonitorError::Schema(_)));
        assert!(err.to_string().contains("Last_SQL_Errno"));
    }

    #[test]
    fn test_locate_optional_columns_may_be_absent() {
        let cols = StatusColumns::locate(&["Last_SQL_Errno"]).unwrap();
        assert_eq!(cols.errno, 0);
        assert_eq!(cols.read_pos, None);
        assert_eq!(cols.exec_pos, None);
        assert_eq!(cols.seconds_behind, None);
    }

    #[test]
    fn test_locate_is_case_sensitive() {
        assert!(StatusColumns::locate(&["last_sql_errno"]).is_err());
    }

    #[test]
    fn test_lag_bytes() {
        let status = SlaveStatus {
            read_master_log_pos: 1_000,
            exec_master_log_pos: 400,
            ..Default::default()
        };
        assert_eq!(status.lag_bytes(), 600);
    }

    #[test]
    fn test_position_mismatch() {
        let mismatch = SlaveStatus {
            read_master_log_pos: 100,
            exec_master_log_pos: 500,
            ..Default::default()
        };
        assert!(mismatch.has_position_mismatch());
        assert_eq!(mismatch.lag_bytes(), -400);

        let aligned = SlaveStatus {
            read_master_log_pos: 500,
            exec_master_log_pos: 500,
            ..Default::default()
        };
        assert!(!aligned.has_position_mismatch());
        assert!(!SlaveStatus::default().has_position_mismatch());
    }

    #[test]
    fn test_all_zero_is_ambiguous() {
        // No replication row and a fully caught-up replica at position 0
        // produce the same snapshot.
        let no_row = SlaveStatus::default();
        let caught_up_at_zero = SlaveStatus {
            errno: 0,
            read_master_log_pos: 0,
            exec_master_log_pos: 0,
            seconds_behind_master: 0,
        };
        assert!(no_row.is_all_zero());
        assert_eq!(no_row, caught_up_at_zero);

        let healthy = SlaveStatus {
            read_master_log_pos: 4,
            exec_master_log_pos: 4,
            ..Default::default()
        };
        assert!(!healthy.is_all_zero());
    }

    #[test]
    fn test_decode_full_row() {
        let row = TextRow(vec![
            ("Slave_IO_State", None),
            ("Read_Master_Log_Pos", Some(9_000)),
            ("Exec_Master_Log_Pos", Some(8_500)),
            ("Seconds_Behind_Master", Some(3)),
            ("Last_SQL_Errno", Some(1062)),
        ]);
        let status = decode_status(&row).unwrap();
        assert_eq!(
            status,
            SlaveStatus {
                errno: 1062,
                read_master_log_pos: 9_000,
                exec_master_log_pos: 8_500,
                seconds_behind_master: 3,
            }
        );
    }

    #[test]
    fn test_decode_null_reads_as_zero() {
        // Seconds_Behind_Master is NULL while the SQL thread is stopped.
        let row = TextRow(vec![
            ("Read_Master_Log_Pos", Some(4_096)),
            ("Exec_Master_Log_Pos", None),
            ("Seconds_Behind_Master", None),
            ("Last_SQL_Errno", None),
        ]);
        let status = decode_status(&row).unwrap();
        assert_eq!(status.errno, 0);
        assert_eq!(status.read_master_log_pos, 4_096);
        assert_eq!(status.exec_master_log_pos, 0);
        assert_eq!(status.seconds_behind_master, 0);
    }

    #[test]
    fn test_decode_missing_optional_column_reads_as_zero() {
        let row = TextRow(vec![
            ("Last_SQL_Errno", Some(1942)),
            ("Exec_Master_Log_Pos", Some(77)),
        ]);
        let status = decode_status(&row).unwrap();
        assert_eq!(status.errno, 1942);
        assert_eq!(status.read_master_log_pos, 0);
        assert_eq!(status.exec_master_log_pos, 77);
        assert_eq!(status.seconds_behind_master, 0);
        assert!(status.has_position_mismatch());
    }

    #[test]
    fn test_decode_out_of_range_errno_reads_as_zero() {
        for bad in [-1, i64::from(u32::MAX) + 1] {
            let row = TextRow(vec![("Last_SQL_Errno", Some(bad))]);
            assert_eq!(decode_status(&row).unwrap().errno, 0, "errno {}", bad);
        }
        let row = TextRow(vec![("Last_SQL_Errno", Some(i64::from(u32::MAX)))]);
        assert_eq!(decode_status(&row).unwrap().errno, u32::MAX);
    }

    #[test]
    fn test_decode_without_errno_column_fails() {
        let row = TextRow(vec![("Read_Master_Log_Pos", Some(1))]);
        assert!(matches!(decode_status(&row), Err(MonitorError::Schema(_))));
    }
}
