//! Fuzz target for config parsing.
//!
//! Arbitrary TOML must produce a config or an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use replica_watchdog::config::WatchdogConfig;

fuzz_target!(|content: &str| {
    if let Ok(config) = WatchdogConfig::from_toml_str(content) {
        assert!(!config.targets.is_empty());
        let _ = config.intervals.idle_interval_duration();
        let _ = config.connection.read_timeout_duration();
    }
});
