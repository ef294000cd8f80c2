// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replica watchdog.
//!
//! Errors are categorized by their source (database, configuration, schema)
//! and carry enough context to be logged once and then either retried or
//! surfaced to the operator.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Database` | Yes | Query/exec failures, dropped connections |
//! | `Timeout` | Yes | A round trip exceeded its configured bound |
//! | `Connection` | Yes | Replica unreachable while connecting |
//! | `Schema` | No | `SHOW SLAVE STATUS` lacks a mandatory column |
//! | `Config` | No | Configuration invalid |
//! | `ConfigIo` | No | Configuration file unreadable |
//! | `ConfigParse` | No | Configuration file is not valid TOML |
//!
//! Replication error codes reported by the server (1062, 1942, ...) are not
//! errors at this level. They are inputs to the remediation dispatcher.

use thiserror::Error;

/// Result type alias for watchdog operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while monitoring a replica.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// sqlx error while talking to a replica.
    ///
    /// Retryable: the connection layer reconnects on the next acquire.
    #[error("Database error ({operation}): {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// A database round trip did not finish within its bound.
    #[error("Timed out after {after_ms}ms ({operation})")]
    Timeout { operation: String, after_ms: u64 },

    /// Replica unreachable while establishing the initial connection.
    #[error("Connection error ({target}): {message}")]
    Connection { target: String, message: String },

    /// The replication status result set is missing a mandatory column.
    #[error("Incompatible replication status schema: {0}")]
    Schema(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML or has mistyped values.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl MonitorError {
    /// Create a database error tagged with the operation that failed.
    pub fn database(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Database {
            operation: operation.into(),
            source,
        }
    }

    /// Create a timeout error for an operation bounded by `after`.
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database { .. } => true,
            Self::Timeout { .. } => true,
            Self::Connection { .. } => true,
            Self::Schema(_) => false, // Server version we don't understand
            Self::Config(_) => false,
            Self::ConfigIo { .. } => false,
            Self::ConfigParse(_) => false,
        }
    }
}
