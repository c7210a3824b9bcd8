//! Planner error types.

use thiserror::Error;

/// Errors that make a topology request impossible to place.
///
/// These fail fast, before any remote side effect.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("host list is empty")]
    NoHosts,

    #[error("topology requires at least one server instance")]
    NoServers,
}
