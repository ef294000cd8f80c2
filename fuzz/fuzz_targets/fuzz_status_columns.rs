//! Fuzz target for status column location.
//!
//! `StatusColumns::locate` must never panic and, when it succeeds, every
//! index it returns must point at the column it names.

#![no_main]

use libfuzzer_sys::fuzz_target;
use replica_watchdog::status::{StatusColumns, COL_LAST_SQL_ERRNO, COL_READ_MASTER_LOG_POS};

fuzz_target!(|names: Vec<&str>| {
    if let Ok(cols) = StatusColumns::locate(&names) {
        assert_eq!(names[cols.errno], COL_LAST_SQL_ERRNO);
        if let Some(i) = cols.read_pos {
            assert_eq!(names[i], COL_READ_MASTER_LOG_POS);
        }
    } else {
        assert!(!names.contains(&COL_LAST_SQL_ERRNO));
    }
});
