// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replica connection seam.
//!
//! The monitor talks to a replica only through [`ReplicaConnection`]: read
//! the replication status, run a remediation batch, and check liveness.
//! [`MariaDbReplica`] is the production implementation over a sqlx pool;
//! tests script their own.
//!
//! # Example
//!
//! ```rust,no_run
//! use replica_watchdog::replica::{ReplicaConnection, BoxFuture};
//! use replica_watchdog::status::SlaveStatus;
//!
//! struct AlwaysHealthy;
//!
//! impl ReplicaConnection for AlwaysHealthy {
//!     fn slave_status(&self) -> BoxFuture<'_, SlaveStatus> {
//!         Box::pin(async move {
//!             Ok(SlaveStatus { read_master_log_pos: 4, exec_master_log_pos: 4, ..Default::default() })
//!         })
//!     }
//!
//!     fn execute_batch(&self, _batch: String) -> BoxFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn ping(&self) -> BoxFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//! }
//! ```

use crate::config::{ConnectionSettings, Target};
use crate::error::{MonitorError, Result};
use crate::status::{self, SlaveStatus};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::Connection;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What the monitor needs from a replica.
pub trait ReplicaConnection: Send + Sync + 'static {
    /// Run `SHOW SLAVE STATUS` and decode it.
    fn slave_status(&self) -> BoxFuture<'_, SlaveStatus>;

    /// Run a semicolon-joined statement batch in one round trip.
    ///
    /// The server stops at the first failing statement; earlier statements
    /// stay applied.
    fn execute_batch(&self, batch: String) -> BoxFuture<'_, ()>;

    /// Liveness check after a failed query.
    fn ping(&self) -> BoxFuture<'_, ()>;
}

/// A MariaDB replica reached through a single-connection sqlx pool.
///
/// The pool renews its one connection after `max_lifetime` / `idle_timeout`
/// and reconnects transparently on the next acquire after a failure.
pub struct MariaDbReplica {
    name: String,
    pool: MySqlPool,
    settings: ConnectionSettings,
}

impl MariaDbReplica {
    /// Connect to a target and ping it once.
    ///
    /// Failure here is fatal for that target's monitor.
    pub async fn connect(target: &Target, settings: &ConnectionSettings) -> Result<Self> {
        let connect_timeout = settings.connect_timeout_duration();
        info!(replica = %target.name, address = %target.address(), "Connecting to replica");

        let options = MySqlConnectOptions::new()
            .host(&target.host)
            .port(target.port)
            .username(&target.username)
            .password(&target.password);

        let pool_options = MySqlPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .max_lifetime(settings.max_lifetime_duration())
            .idle_timeout(settings.idle_timeout_duration())
            .acquire_timeout(connect_timeout);

        let pool = match timeout(connect_timeout, pool_options.connect_with(options)).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(e)) => {
                return Err(MonitorError::Connection {
                    target: target.name.clone(),
                    message: format!("Failed to connect to database: {}", e),
                })
            }
            Err(_) => {
                return Err(MonitorError::Connection {
                    target: target.name.clone(),
                    message: format!(
                        "Connection timed out after {}ms",
                        connect_timeout.as_millis()
                    ),
                })
            }
        };

        let replica = Self {
            name: target.name.clone(),
            pool,
            settings: settings.clone(),
        };

        replica.ping_inner().await.map_err(|e| MonitorError::Connection {
            target: target.name.clone(),
            message: format!("Failed to ping database: {}", e),
        })?;

        debug!(replica = %replica.name, "Replica connection verified");
        Ok(replica)
    }

    /// Replica name (for logging).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ping_inner(&self) -> Result<()> {
        let bound = self.settings.connect_timeout_duration();
        bounded("ping", bound, async {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| MonitorError::database("acquire", e))?;
            conn.ping().await.map_err(|e| MonitorError::database("ping", e))
        })
        .await
    }
}

impl ReplicaConnection for MariaDbReplica {
    fn slave_status(&self) -> BoxFuture<'_, SlaveStatus> {
        Box::pin(async move {
            bounded(
                status::SLAVE_STATUS_QUERY,
                self.settings.read_timeout_duration(),
                status::read_slave_status(&self.pool),
            )
            .await
        })
    }

    fn execute_batch(&self, batch: String) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let bound = self.settings.read_timeout_duration() + self.settings.write_timeout_duration();
            bounded("remediation", bound, async {
                sqlx::raw_sql(&batch)
                    .execute(&self.pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| MonitorError::database("remediation", e))
            })
            .await
        })
    }

    fn ping(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.ping_inner())
    }
}

/// Run `fut` with an upper bound, mapping expiry to [`MonitorError::Timeout`].
async fn bounded<T>(
    operation: &str,
    bound: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout(bound, fut).await {
        Ok(result) => result,
        Err(_) => Err(MonitorError::timeout(operation, bound)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_result_through() {
        let ok = bounded("op", Duration::from_secs(1), async { Ok::<_, MonitorError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = bounded("op", Duration::from_secs(1), async {
            Err::<(), _>(MonitorError::Schema("missing".to_string()))
        })
        .await;
        assert!(matches!(err, Err(MonitorError::Schema(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result = bounded("SHOW SLAVE STATUS", Duration::from_secs(30), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, MonitorError::Timeout { .. }));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("30000ms"));
    }

    #[tokio::test]
    async fn test_connect_unreachable_is_connection_error() {
        // Port 1 on localhost refuses connections immediately.
        let target = Target::for_testing("unreachable", "127.0.0.1", 1);
        let settings = ConnectionSettings {
            connect_timeout: "2s".to_string(),
            ..Default::default()
        };

        let err = MariaDbReplica::connect(&target, &settings).await.err().unwrap();
        assert!(matches!(err, MonitorError::Connection { .. }));
        assert!(err.to_string().contains("unreachable"));
    }
}
