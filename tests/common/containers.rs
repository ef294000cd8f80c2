// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Testcontainers setup for MariaDB.
//!
//! Provides helpers to spin up a standalone MariaDB server for integration
//! tests. The server has no replication configured.

use replica_watchdog::config::{ConnectionSettings, Target};
use replica_watchdog::replica::MariaDbReplica;
use std::time::Duration;
use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};

pub const ROOT_PASSWORD: &str = "watchdog";

/// Create a MariaDB 11 container.
///
/// The entrypoint prints "ready for connections" once for its init server
/// too, so callers should connect with [`connect_with_retry`].
pub fn mariadb_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("mariadb", "11")
        .with_env_var("MARIADB_ROOT_PASSWORD", ROOT_PASSWORD)
        .with_exposed_port(3306)
        .with_wait_for(WaitFor::message_on_stderr("ready for connections"));
    docker.run(image)
}

/// Target pointing at a container.
pub fn mariadb_target(container: &Container<'_, GenericImage>, name: &str) -> Target {
    let port = container.get_host_port_ipv4(3306);
    Target {
        password: ROOT_PASSWORD.to_string(),
        ..Target::for_testing(name, "127.0.0.1", port)
    }
}

/// URL for direct sqlx access (assertions on server state).
pub fn mariadb_url(container: &Container<'_, GenericImage>) -> String {
    let port = container.get_host_port_ipv4(3306);
    format!("mysql://root:{}@127.0.0.1:{}", ROOT_PASSWORD, port)
}

/// Connect, retrying while the server finishes initialising.
pub async fn connect_with_retry(target: &Target) -> MariaDbReplica {
    let settings = ConnectionSettings::default();
    let mut last_error = None;

    for _ in 0..30 {
        match MariaDbReplica::connect(target, &settings).await {
            Ok(replica) => return replica,
            Err(e) => {
                last_error = Some(e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    panic!("MariaDB never became reachable: {:?}", last_error);
}
