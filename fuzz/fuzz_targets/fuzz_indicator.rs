//! Fuzz target for the lag indicator.
//!
//! Arbitrary (including regressing or extreme) positions and poll gaps must
//! never panic, and the reported lag must always be read minus exec.

#![no_main]

use libfuzzer_sys::fuzz_target;
use replica_watchdog::indicator::RateWindow;
use replica_watchdog::status::SlaveStatus;
use std::time::Duration;
use tokio::time::Instant;

fuzz_target!(|polls: Vec<(i64, i64, u16)>| {
    let mut now = Instant::now();
    let mut window = RateWindow::new(now);

    for (read, exec, gap_ms) in polls {
        now += Duration::from_millis(u64::from(gap_ms));
        let status = SlaveStatus {
            read_master_log_pos: read,
            exec_master_log_pos: exec,
            ..Default::default()
        };
        let indicator = window.observe(&status, now);
        assert_eq!(indicator.lag(), status.lag_bytes());
        let _ = indicator.to_string();
    }
});
