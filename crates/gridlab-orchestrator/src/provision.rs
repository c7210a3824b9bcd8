//! The provisioning protocol — one instance container at a time.
//!
//! Everything here sits directly on the command executor with no
//! protocol state of its own: a launch starts an instance container
//! detached, and the registration rendezvous blocks inside a server
//! container until its expected agents have shown up. The rendezvous
//! carries no timeout here; the entrypoint owns that behavior.

use gridlab_core::BundleConfig;
use gridlab_exec::CommandRunner;
use gridlab_topology::{AgentInstance, Placement, ServerInstance};
use tracing::{info, warn};

/// Placeholder for an empty expected-agent list in entrypoint argv.
const NONE_MARKER: &str = "none";

/// `<runtime> run ...` argv for one instance container.
///
/// Containers share the host network namespace, mount the staging
/// directory at its own path plus the shared state root, and carry the
/// system label so cleanup can find them later.
pub fn run_argv(
    bundle: &BundleConfig,
    placement: &Placement,
    name: &str,
    role_args: &[String],
) -> Vec<String> {
    let staging = bundle.staging_dir.to_string_lossy();
    let mut argv = vec![
        bundle.runtime.clone(),
        "run".to_string(),
        "--network".to_string(),
        "host".to_string(),
        "--detach".to_string(),
        "--rm".to_string(),
        "--label".to_string(),
        bundle.label_value(),
        "--volume".to_string(),
        format!("{staging}:{staging}"),
        "--volume".to_string(),
        format!(
            "{}:{}",
            bundle.state_root.to_string_lossy(),
            bundle.state_mount.to_string_lossy()
        ),
        "--entrypoint".to_string(),
        bundle.entrypoint_path().to_string_lossy().into_owned(),
        "--name".to_string(),
        name.to_string(),
    ];
    for alias in &placement.host_aliases {
        argv.push("--add-host".to_string());
        argv.push(format!("{}:{}", alias.name, alias.addr));
    }
    argv.push(bundle.image_tag.clone());
    argv.extend_from_slice(role_args);
    argv
}

/// Role argv for a server instance.
///
/// `<profile> server <ordinal> <leader 0|1> <rpc> <aux> <expected|none>
/// <cpus|0> [peers]` — a server with no expected agents advertises zero
/// cpu slots. The leader is the attach point for everyone else, so only
/// non-leaders receive the peer list (the other servers' endpoints), and
/// only in multi-server mode.
pub fn server_role_args(placement: &Placement, server: &ServerInstance) -> Vec<String> {
    let mut args = vec![
        "server".to_string(),
        server.ordinal.to_string(),
        if server.is_leader { "1" } else { "0" }.to_string(),
        server.rpc_port.to_string(),
        server.aux_port.to_string(),
    ];
    if server.expected_agents.is_empty() {
        args.push(NONE_MARKER.to_string());
        args.push("0".to_string());
    } else {
        args.push(expected_csv(server));
        args.push(placement.cpus_per_agent.to_string());
    }
    if placement.multi_server() && !server.is_leader {
        args.push(
            placement
                .server_endpoints
                .iter()
                .filter(|ep| ep.name != server.name)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    args
}

/// Role argv for an agent instance.
///
/// `<profile> agent <port> <primary> <own-name> [peers]`.
pub fn agent_role_args(placement: &Placement, agent: &AgentInstance) -> Vec<String> {
    let mut args = vec![
        "agent".to_string(),
        agent.port.to_string(),
        agent.primary_server().to_string(),
        agent.name.clone(),
    ];
    if placement.multi_server() {
        args.push(peer_csv(placement));
    }
    args
}

/// `<runtime> exec <server> <entrypoint> waitsvr <expected>` argv.
pub fn waitsvr_argv(bundle: &BundleConfig, server: &ServerInstance) -> Vec<String> {
    let expected = if server.expected_agents.is_empty() {
        NONE_MARKER.to_string()
    } else {
        expected_csv(server)
    };
    vec![
        bundle.runtime.clone(),
        "exec".to_string(),
        server.name.clone(),
        bundle.entrypoint_path().to_string_lossy().into_owned(),
        "waitsvr".to_string(),
        expected,
    ]
}

fn expected_csv(server: &ServerInstance) -> String {
    server
        .expected_agents
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn peer_csv(placement: &Placement) -> String {
    placement
        .server_endpoints
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Launch a server container, then block on its registration rendezvous.
///
/// Succeeds only if both steps do. Agents may come up before, during,
/// or after this call — the in-container wait is the single ordering
/// guarantee the rollout relies on.
pub async fn provision_server<R: CommandRunner>(
    runner: &R,
    bundle: &BundleConfig,
    placement: &Placement,
    server: &ServerInstance,
) -> bool {
    let mut role = vec![bundle.profile.clone()];
    role.extend(server_role_args(placement, server));
    let argv = run_argv(bundle, placement, &server.name, &role);

    if !runner.run(&server.host, &argv).await {
        warn!(instance = %server.name, host = %server.host, "failed to configure");
        return false;
    }

    let registered = runner.run(&server.host, &waitsvr_argv(bundle, server)).await;
    if registered {
        info!(instance = %server.name, host = %server.host, "configured");
    } else {
        warn!(
            instance = %server.name,
            host = %server.host,
            "agent registration rendezvous failed"
        );
    }
    registered
}

/// Launch an agent container.
///
/// Agents do not block on anything: they register with their upstream
/// servers asynchronously once running.
pub async fn provision_agent<R: CommandRunner>(
    runner: &R,
    bundle: &BundleConfig,
    placement: &Placement,
    agent: &AgentInstance,
) -> bool {
    let mut role = vec![bundle.profile.clone()];
    role.extend(agent_role_args(placement, agent));
    let argv = run_argv(bundle, placement, &agent.name, &role);

    let launched = runner.run(&agent.host, &argv).await;
    if launched {
        info!(instance = %agent.name, host = %agent.host, "configured");
    } else {
        warn!(instance = %agent.name, host = %agent.host, "failed to configure");
    }
    launched
}
