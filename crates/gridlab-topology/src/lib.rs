//! GridLab topology planner — deterministic instance placement.
//!
//! Maps a topology request plus an ordered host list to a concrete
//! [`Placement`]: per-host server and agent instances with assigned
//! names, ports, and peer references. Planning is a pure function — no
//! I/O, no shared state — so identical inputs always yield identical
//! placements.
//!
//! # Components
//!
//! - **`placement`** — The placement data model (instances, endpoints)
//! - **`planner`** — The planning algorithm

pub mod error;
pub mod placement;
pub mod planner;

pub use error::TopologyError;
pub use placement::{
    AgentInstance, AgentRef, HostAlias, HostPlacement, Placement, ServerEndpoint, ServerInstance,
};
pub use planner::{PORT_BASE, plan};
