//! Shared test utilities for monitor and integration tests.
//!
//! This module provides:
//! - MariaDB testcontainer setup
//! - Scripted mock ReplicaConnection for recording remediations
//! - SlaveStatus helpers

pub mod containers;
pub mod mock_replica;

#[allow(unused_imports)]
pub use containers::*;
#[allow(unused_imports)]
pub use mock_replica::*;
