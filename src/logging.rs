// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Log output.
//!
//! Two formats over the same `tracing` events:
//!
//! - **compat** (default): one line per event, parseable by existing log
//!   scrapers:
//!   ```text
//!   [db1] 2026/01/15 14:03:07 errno=1062 ✓ (caught up) action=skip backoff=0s
//!   ```
//! - **structured**: the stock `tracing-subscriber` fmt layer.
//!
//! Both honour `RUST_LOG` and default to `info`.

use chrono::Local;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Field carrying the replica name on every monitor event.
pub const REPLICA_FIELD: &str = "replica";

/// Timestamp layout of the compat format.
pub const COMPAT_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Compat,
    Structured,
}

/// Install the global subscriber. Call once, before any monitor starts.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Compat => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .event_format(CompatFormat)
            .init(),
        LogFormat::Structured => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

/// `[replica] YYYY/MM/DD HH:MM:SS message key=value...`
///
/// Events without a `replica` field (process-level lines) drop the prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatFormat;

impl<S, N> FormatEvent<S, N> for CompatFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = CompatFields::default();
        event.record(&mut fields);

        if let Some(replica) = &fields.replica {
            write!(writer, "[{}] ", replica)?;
        }
        write!(writer, "{} {}", Local::now().format(COMPAT_TIME_FORMAT), fields.message)?;
        for (name, value) in &fields.extra {
            write!(writer, " {}={}", name, value)?;
        }
        writeln!(writer)
    }
}

#[derive(Debug, Default)]
struct CompatFields {
    replica: Option<String>,
    message: String,
    extra: Vec<(&'static str, String)>,
}

impl Visit for CompatFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            REPLICA_FIELD => self.replica = Some(value.to_string()),
            "message" => self.message.push_str(value),
            name => self.extra.push((name, value.to_string())),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            REPLICA_FIELD => self.replica = Some(format!("{:?}", value)),
            "message" => {
                let _ = write!(self.message, "{:?}", value);
            }
            name => self.extra.push((name, format!("{:?}", value))),
        }
    }
}
