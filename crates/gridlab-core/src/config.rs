//! Run configuration parser.
//!
//! A run configuration is a JSON file mapping setup names to topology
//! requests. The planner consumes four fields of each request; anything
//! else (job counts, database mode, ...) is opaque passthrough for the
//! downstream workload generator and is preserved verbatim.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Declarative description of the cluster size and shape to provision.
///
/// The wire names (`total_num_svrs`, `total_num_moms`, ...) are fixed by
/// the topology-request generator that produces the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyRequest {
    /// Number of server instances across the whole cluster. Must be ≥ 1.
    #[serde(rename = "total_num_svrs")]
    pub total_servers: u32,

    /// Total number of worker-agent instances across the whole cluster.
    #[serde(rename = "total_num_moms")]
    pub total_agents: u32,

    /// Worker-agent instances started on each host.
    #[serde(rename = "num_moms_per_host")]
    pub agents_per_host: u32,

    /// Cpu slots advertised by each worker agent.
    #[serde(rename = "num_cpus_per_mom")]
    pub cpus_per_agent: u32,

    /// Fields consumed by the workload generator, not by the planner.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The full run configuration: named setups in deterministic (sorted) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Setup name → topology request.
    pub setups: BTreeMap<String, TopologyRequest>,
}

impl RunConfig {
    /// Load a run configuration from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
