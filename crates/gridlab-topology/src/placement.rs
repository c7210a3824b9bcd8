//! The placement data model.
//!
//! Explicit typed records instead of nested name-keyed maps: each record
//! owns its identity, and cross-references between servers and agents go
//! through names and ordinals, never shared mutable lists.

use std::net::IpAddr;

use gridlab_core::Host;

/// A server's advertised control endpoint, as `name:rpc_port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    pub name: String,
    pub rpc_port: u16,
}

impl std::fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.rpc_port)
    }
}

/// One agent as seen from the server expecting it to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRef {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for AgentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.host, self.port)
    }
}

/// A server instance pinned to a host.
///
/// `expected_agents` is the rendezvous contract: the agents this server
/// blocks for at startup. Every agent in the cluster appears in exactly
/// one server's `expected_agents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInstance {
    /// Unique instance name, `server-<ordinal>`.
    pub name: String,
    /// 1-based, contiguous across the whole cluster.
    pub ordinal: u32,
    /// Name of the host this instance runs on.
    pub host: String,
    /// The single attach point for all peers (ordinal 1). The leader
    /// receives no upstream peer list.
    pub is_leader: bool,
    pub rpc_port: u16,
    pub aux_port: u16,
    pub expected_agents: Vec<AgentRef>,
}

/// A worker-agent instance pinned to a host.
///
/// `upstream_servers` always starts with the agent's primary server (the
/// one whose `expected_agents` lists it); in a multi-server cluster the
/// list continues with every other server's endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInstance {
    /// Unique instance name, `agent-<primary-server-ordinal>-<index>`.
    pub name: String,
    /// Name of the host this instance runs on.
    pub host: String,
    pub port: u16,
    pub upstream_servers: Vec<ServerEndpoint>,
}

impl AgentInstance {
    /// The server this agent registers with first.
    pub fn primary_server(&self) -> &ServerEndpoint {
        &self.upstream_servers[0]
    }
}

/// `server-name -> host-address` pair for container host aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAlias {
    pub name: String,
    pub addr: IpAddr,
}

/// All instances assigned to one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlacement {
    pub host: Host,
    pub servers: Vec<ServerInstance>,
    pub agents: Vec<AgentInstance>,
}

/// The concrete cluster layout derived from one topology request.
///
/// Computed fresh per request and discarded once the cluster is torn
/// down; it carries no long-lived state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Per-host instance lists, in input host order.
    pub hosts: Vec<HostPlacement>,
    /// Every server endpoint, in ordinal order. Handed to each container
    /// in multi-server mode so any instance can reach any server.
    pub server_endpoints: Vec<ServerEndpoint>,
    /// `--add-host` aliases mapping server names to their host addresses.
    pub host_aliases: Vec<HostAlias>,
    /// Cpu slots each agent advertises, passed through to server launch.
    pub cpus_per_agent: u32,
}

impl Placement {
    /// Iterate all server instances across hosts.
    pub fn servers(&self) -> impl Iterator<Item = &ServerInstance> {
        self.hosts.iter().flat_map(|hp| hp.servers.iter())
    }

    /// Iterate all agent instances across hosts.
    pub fn agents(&self) -> impl Iterator<Item = &AgentInstance> {
        self.hosts.iter().flat_map(|hp| hp.agents.iter())
    }

    /// Total instances of both roles.
    pub fn instance_count(&self) -> usize {
        self.hosts
            .iter()
            .map(|hp| hp.servers.len() + hp.agents.len())
            .sum()
    }

    /// Whether this is a multi-server cluster (peer lists required).
    pub fn multi_server(&self) -> bool {
        self.server_endpoints.len() > 1
    }
}
