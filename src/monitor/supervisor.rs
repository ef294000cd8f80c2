// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Process-level supervisor: one task per configured replica.
//!
//! Each task connects on its own. A target that cannot be reached at startup
//! ends its task; the other targets keep running.

use super::TargetMonitor;
use crate::config::WatchdogConfig;
use crate::error::MonitorError;
use crate::replica::MariaDbReplica;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Connect to every target and monitor them until all tasks end.
///
/// Returns the number of monitors that ended in error. Monitors only end on
/// a startup failure, so under normal operation this never returns.
pub async fn run_all(config: WatchdogConfig) -> usize {
    let WatchdogConfig {
        global,
        intervals,
        connection,
        targets,
    } = config;
    let global = Arc::new(global);

    let mut tasks = JoinSet::new();
    for target in targets {
        let global = Arc::clone(&global);
        let intervals = intervals.clone();
        let connection = connection.clone();

        tasks.spawn(async move {
            let name = target.name.clone();
            let result = async move {
                let replica = MariaDbReplica::connect(&target, &connection).await?;
                TargetMonitor::new(target.name.clone(), replica, global, intervals)
                    .run()
                    .await;
                Ok::<(), MonitorError>(())
            }
            .await;
            (name, result)
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!(replica = %name, "Monitor stopped"),
            Ok((name, Err(e))) => {
                failed += 1;
                match e {
                    MonitorError::Connection { message, .. } => error!(replica = %name, "{}", message),
                    other => error!(replica = %name, "{}", other),
                }
            }
            Err(e) => {
                failed += 1;
                error!(error = %e, "Monitor task aborted");
            }
        }
    }
    failed
}
