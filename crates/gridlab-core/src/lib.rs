//! GridLab core — run configuration, topology requests, host resolution.
//!
//! This crate holds the types shared by every other GridLab crate:
//! the run configuration file (named setups, each a topology request),
//! the deployable bundle description, and the host list with its
//! resolution from a newline-delimited nodes file.

pub mod bundle;
pub mod config;
pub mod hosts;

pub use bundle::BundleConfig;
pub use config::{RunConfig, TopologyRequest};
pub use hosts::{Host, local_hostname, read_nodes_file, resolve_hosts, same_host};
