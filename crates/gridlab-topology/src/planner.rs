//! The planning algorithm.
//!
//! Placement happens in three passes over the host list:
//!
//! 1. Round-robin server ordinals across hosts, assigning names and port
//!    pairs from each host's own counter.
//! 2. Create each host's agent slots, continuing that host's port counter.
//! 3. Assign every agent a primary server by cycling the flat
//!    ordinal-ordered server list (restarting per host), then invert the
//!    assignment into each server's `expected_agents`.
//!
//! Port counters are host-local on purpose: every container binds in its
//! host's own network namespace, so two hosts reusing the same port range
//! never collide. Do not globalize this.

use gridlab_core::{Host, TopologyRequest};
use tracing::debug;

use crate::error::TopologyError;
use crate::placement::{
    AgentInstance, AgentRef, HostAlias, HostPlacement, Placement, ServerEndpoint, ServerInstance,
};

/// First port assigned on each host. Each instance consumes two: a
/// control port and an auxiliary port (agents use only the first).
pub const PORT_BASE: u16 = 18000;

/// Map a topology request onto a host list.
///
/// Pure and deterministic: identical inputs, including host order,
/// produce identical placements. Fails only on an empty host list or a
/// serverless request, before any remote effect.
pub fn plan(request: &TopologyRequest, hosts: &[Host]) -> Result<Placement, TopologyError> {
    if hosts.is_empty() {
        return Err(TopologyError::NoHosts);
    }
    if request.total_servers < 1 {
        return Err(TopologyError::NoServers);
    }

    let host_count = hosts.len();
    let total_servers = request.total_servers as usize;

    // Pass 1/2: round-robin server counts, then per-host skeletons.
    let mut server_counts = vec![0u32; host_count];
    for i in 0..total_servers {
        server_counts[i % host_count] += 1;
    }

    let mut placements: Vec<HostPlacement> = Vec::with_capacity(host_count);
    let mut server_endpoints: Vec<ServerEndpoint> = Vec::with_capacity(total_servers);
    let mut host_aliases: Vec<HostAlias> = Vec::with_capacity(total_servers);
    let mut ordinal: u32 = 1;

    for (hi, host) in hosts.iter().enumerate() {
        let mut next_port = PORT_BASE;
        let mut servers = Vec::with_capacity(server_counts[hi] as usize);
        for _ in 0..server_counts[hi] {
            let name = format!("server-{ordinal}");
            servers.push(ServerInstance {
                name: name.clone(),
                ordinal,
                host: host.name.clone(),
                is_leader: ordinal == 1,
                rpc_port: next_port,
                aux_port: next_port + 1,
                expected_agents: Vec::new(),
            });
            server_endpoints.push(ServerEndpoint {
                name: name.clone(),
                rpc_port: next_port,
            });
            host_aliases.push(HostAlias {
                name,
                addr: host.addr,
            });
            next_port += 2;
            ordinal += 1;
        }

        let mut agents = Vec::with_capacity(request.agents_per_host as usize);
        for _ in 0..request.agents_per_host {
            agents.push(AgentInstance {
                name: String::new(),
                host: host.name.clone(),
                port: next_port,
                upstream_servers: Vec::new(),
            });
            next_port += 2;
        }

        placements.push(HostPlacement {
            host: host.clone(),
            servers,
            agents,
        });
    }

    // Pass 3: primary-server assignment. Each host's agents cycle the
    // flat server list from the top; hosts that received zero servers
    // contribute nothing to the list and are skipped implicitly.
    let multi = server_endpoints.len() > 1;
    let mut per_server_agent_index = vec![0u32; total_servers];
    let mut expected: Vec<Vec<AgentRef>> = vec![Vec::new(); total_servers];

    for hp in &mut placements {
        for (slot, agent) in hp.agents.iter_mut().enumerate() {
            let primary_idx = slot % total_servers;
            let primary = &server_endpoints[primary_idx];

            agent.name = format!(
                "agent-{}-{}",
                primary_idx + 1,
                per_server_agent_index[primary_idx]
            );
            per_server_agent_index[primary_idx] += 1;

            agent.upstream_servers.push(primary.clone());
            if multi {
                agent.upstream_servers.extend(
                    server_endpoints
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != primary_idx)
                        .map(|(_, ep)| ep.clone()),
                );
            }

            expected[primary_idx].push(AgentRef {
                name: agent.name.clone(),
                host: agent.host.clone(),
                port: agent.port,
            });
        }
    }

    for hp in &mut placements {
        for server in &mut hp.servers {
            server.expected_agents = expected[(server.ordinal - 1) as usize].clone();
        }
    }

    debug!(
        servers = total_servers,
        agents = host_count * request.agents_per_host as usize,
        hosts = host_count,
        "planned topology"
    );

    Ok(Placement {
        hosts: placements,
        server_endpoints,
        host_aliases,
        cpus_per_agent: request.cpus_per_agent,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn make_hosts(n: u8) -> Vec<Host> {
        (1..=n)
            .map(|i| Host {
                name: format!("host{i}.example.com"),
                addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, i)),
            })
            .collect()
    }

    fn make_request(servers: u32, agents_per_host: u32) -> TopologyRequest {
        TopologyRequest {
            total_servers: servers,
            total_agents: 0,
            agents_per_host,
            cpus_per_agent: 2,
            extra: Default::default(),
        }
    }

    #[test]
    fn identical_inputs_yield_identical_placements() {
        let hosts = make_hosts(3);
        let req = make_request(4, 2);

        let a = plan(&req, &hosts).unwrap();
        let b = plan(&req, &hosts).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn servers_round_robin_with_spread_at_most_one() {
        let hosts = make_hosts(2);
        let req = make_request(5, 0);

        let placement = plan(&req, &hosts).unwrap();

        let counts: Vec<usize> = placement.hosts.iter().map(|hp| hp.servers.len()).collect();
        assert_eq!(counts, vec![3, 2]);

        // Ordinals are contiguous 1..=5 and only ordinal 1 leads.
        let ordinals: Vec<u32> = placement.servers().map(|s| s.ordinal).collect();
        let mut sorted = ordinals.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3, 4, 5]);
        assert_eq!(placement.servers().filter(|s| s.is_leader).count(), 1);
        assert!(placement.servers().any(|s| s.is_leader && s.ordinal == 1));
    }

    #[test]
    fn single_server_four_agents_one_host() {
        // Scenario: {total_servers=1, agents_per_host=4} over 1 host.
        let hosts = make_hosts(1);
        let req = make_request(1, 4);

        let placement = plan(&req, &hosts).unwrap();

        let server = placement.servers().next().unwrap();
        assert_eq!(server.expected_agents.len(), 4);

        for agent in placement.agents() {
            assert_eq!(agent.upstream_servers.len(), 1);
            assert_eq!(agent.primary_server().name, "server-1");
        }
    }

    #[test]
    fn multi_server_agents_know_every_server() {
        // Scenario: {total_servers=2, agents_per_host=1} over 2 hosts.
        let hosts = make_hosts(2);
        let req = make_request(2, 1);

        let placement = plan(&req, &hosts).unwrap();

        for hp in &placement.hosts {
            assert_eq!(hp.servers.len(), 1);
            assert_eq!(hp.agents.len(), 1);
        }

        let names: Vec<&str> = placement
            .server_endpoints
            .iter()
            .map(|ep| ep.name.as_str())
            .collect();
        assert_eq!(names, vec!["server-1", "server-2"]);

        for agent in placement.agents() {
            let upstream: HashSet<&str> = agent
                .upstream_servers
                .iter()
                .map(|ep| ep.name.as_str())
                .collect();
            assert_eq!(upstream, HashSet::from(["server-1", "server-2"]));
        }
    }

    #[test]
    fn expected_agents_invert_to_the_full_agent_set() {
        let hosts = make_hosts(3);
        let req = make_request(3, 4);

        let placement = plan(&req, &hosts).unwrap();

        let mut from_servers: Vec<String> = placement
            .servers()
            .flat_map(|s| s.expected_agents.iter().map(|a| a.name.clone()))
            .collect();
        let mut all_agents: Vec<String> = placement.agents().map(|a| a.name.clone()).collect();

        from_servers.sort();
        all_agents.sort();
        assert_eq!(from_servers, all_agents);

        let unique: HashSet<&String> = from_servers.iter().collect();
        assert_eq!(unique.len(), from_servers.len());
    }

    #[test]
    fn expected_agents_match_primary_assignment() {
        let hosts = make_hosts(2);
        let req = make_request(2, 3);

        let placement = plan(&req, &hosts).unwrap();

        for server in placement.servers() {
            for agent_ref in &server.expected_agents {
                let agent = placement
                    .agents()
                    .find(|a| a.name == agent_ref.name)
                    .unwrap();
                assert_eq!(agent.primary_server().name, server.name);
                assert_eq!(agent_ref.host, agent.host);
                assert_eq!(agent_ref.port, agent.port);
            }
        }
    }

    #[test]
    fn ports_are_host_local_and_unique() {
        let hosts = make_hosts(2);
        let req = make_request(3, 2);

        let placement = plan(&req, &hosts).unwrap();

        for hp in &placement.hosts {
            let mut ports = Vec::new();
            for server in &hp.servers {
                ports.push(server.rpc_port);
                ports.push(server.aux_port);
            }
            for agent in &hp.agents {
                ports.push(agent.port);
            }

            let unique: HashSet<u16> = ports.iter().copied().collect();
            assert_eq!(unique.len(), ports.len());

            // Each host starts from the same base — no cross-host
            // coordination, containers bind the host's own namespace.
            assert_eq!(ports.iter().min(), Some(&PORT_BASE));
        }

        // Host 1 got 2 servers, host 2 got 1; agent ports continue the
        // host's own counter in steps of two.
        let first = &placement.hosts[0];
        assert_eq!(first.servers[0].rpc_port, 18000);
        assert_eq!(first.servers[1].rpc_port, 18002);
        assert_eq!(first.agents[0].port, 18004);
        assert_eq!(first.agents[1].port, 18006);

        let second = &placement.hosts[1];
        assert_eq!(second.servers[0].rpc_port, 18000);
        assert_eq!(second.agents[0].port, 18002);
    }

    #[test]
    fn hosts_without_servers_still_get_agents() {
        let hosts = make_hosts(3);
        let req = make_request(1, 2);

        let placement = plan(&req, &hosts).unwrap();

        assert_eq!(placement.hosts[0].servers.len(), 1);
        assert!(placement.hosts[1].servers.is_empty());
        assert!(placement.hosts[2].servers.is_empty());

        // All six agents home to the only server.
        assert_eq!(placement.agents().count(), 6);
        for agent in placement.agents() {
            assert_eq!(agent.upstream_servers.len(), 1);
            assert_eq!(agent.primary_server().name, "server-1");
        }
        let server = placement.servers().next().unwrap();
        assert_eq!(server.expected_agents.len(), 6);
    }

    #[test]
    fn agent_names_are_unique_per_primary_server() {
        let hosts = make_hosts(2);
        let req = make_request(2, 2);

        let placement = plan(&req, &hosts).unwrap();

        let names: HashSet<String> = placement.agents().map(|a| a.name.clone()).collect();
        assert_eq!(names.len(), 4);
        // Both hosts' first slots cycle from the top of the server list.
        assert!(names.contains("agent-1-0"));
        assert!(names.contains("agent-1-1"));
        assert!(names.contains("agent-2-0"));
        assert!(names.contains("agent-2-1"));
    }

    #[test]
    fn server_only_cluster_has_no_agents() {
        let hosts = make_hosts(2);
        let req = make_request(2, 0);

        let placement = plan(&req, &hosts).unwrap();

        assert_eq!(placement.agents().count(), 0);
        for server in placement.servers() {
            assert!(server.expected_agents.is_empty());
        }
    }

    #[test]
    fn empty_host_list_is_rejected() {
        let req = make_request(1, 1);
        assert_eq!(plan(&req, &[]), Err(TopologyError::NoHosts));
    }

    #[test]
    fn serverless_request_is_rejected() {
        let hosts = make_hosts(1);
        let req = make_request(0, 1);
        assert_eq!(plan(&req, &hosts), Err(TopologyError::NoServers));
    }

    #[test]
    fn host_aliases_cover_every_server() {
        let hosts = make_hosts(2);
        let req = make_request(3, 0);

        let placement = plan(&req, &hosts).unwrap();

        assert_eq!(placement.host_aliases.len(), 3);
        assert_eq!(placement.host_aliases[0].name, "server-1");
        assert_eq!(
            placement.host_aliases[0].addr,
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
        );
        // server-2 lands on host 2 by round-robin.
        assert_eq!(
            placement.host_aliases[1].addr,
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2))
        );
    }
}
