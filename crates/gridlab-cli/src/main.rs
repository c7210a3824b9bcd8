//! gridlab — the test-cluster provisioning orchestrator.
//!
//! Reads a run configuration (named setups, each a topology request) and
//! a nodes file, provisions a containerized multi-host cluster per
//! setup, hands each successfully provisioned cluster to the external
//! test harness, and cleans everything up afterward.
//!
//! # Usage
//!
//! ```text
//! gridlab run --dir /stage/gridlab
//! gridlab clean --dir /stage/gridlab
//! ```
//!
//! Exit codes: 0 on success; 1 on invalid invocation, missing
//! prerequisite files, or when invoked as root.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use gridlab_core::{
    BundleConfig, Host, RunConfig, local_hostname, read_nodes_file, resolve_hosts,
};
use gridlab_exec::ShellRunner;
use gridlab_orchestrator::ClusterOrchestrator;
use gridlab_topology::plan;

#[derive(Parser)]
#[command(name = "gridlab", about = "Test-cluster placement and provisioning orchestrator")]
struct Cli {
    /// Staging directory holding the bundle (image archive, entrypoint,
    /// harness script, config.json, nodes).
    #[arg(long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Run configuration file name inside the staging directory.
    #[arg(long, default_value = "config.json", global = true)]
    config: String,

    /// Nodes file name inside the staging directory.
    #[arg(long, default_value = "nodes", global = true)]
    nodes: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Provision each configured setup and run its tests.
    Run,
    /// Remove containers, state, and loaded images from every host.
    Clean,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gridlab=debug".parse().unwrap()),
        )
        .init();

    // The container runtime on every host is driven rootless.
    // SAFETY: getuid has no preconditions and cannot fail.
    if unsafe { libc::getuid() } == 0 {
        bail!("gridlab must be run as a non-root user");
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Exit 1 on bad invocation, matching the documented contract.
            let _ = err.print();
            std::process::exit(1);
        }
    };

    let dir = cli
        .dir
        .canonicalize()
        .with_context(|| format!("staging directory {} not found", cli.dir.display()))?;
    let bundle = BundleConfig::new(dir.clone());

    let names = read_nodes_file(&dir.join(&cli.nodes))?;
    let hosts = resolve_hosts(&names).await?;

    let runner = Arc::new(ShellRunner::new(local_hostname()));
    let orchestrator = ClusterOrchestrator::new(runner, bundle.clone());

    match cli.command {
        Command::Clean => {
            orchestrator.full_clean(&hosts).await;
            Ok(())
        }
        Command::Run => run(&dir, &cli.config, &bundle, &hosts, &orchestrator).await,
    }
}

async fn run(
    dir: &Path,
    config_name: &str,
    bundle: &BundleConfig,
    hosts: &[Host],
    orchestrator: &ClusterOrchestrator<ShellRunner>,
) -> anyhow::Result<()> {
    // Prerequisites, checked before any remote effect.
    let config = RunConfig::from_file(&dir.join(config_name))
        .with_context(|| format!("could not load {config_name}"))?;
    if !bundle.archive_path().is_file() {
        bail!("could not find {}", bundle.archive_path().display());
    }

    // Start from a clean slate on every host.
    orchestrator.full_clean(hosts).await;

    // Fresh results for this run.
    let _ = tokio::fs::remove_dir_all(dir.join("results")).await;

    if !orchestrator.distribute_bundle(hosts).await {
        warn!("bundle distribution failed on some hosts; their instances will not launch");
    }

    for (name, request) in &config.setups {
        info!(setup = %name, "configuring setup");
        let placement = match plan(request, hosts) {
            Ok(placement) => placement,
            Err(err) => {
                warn!(setup = %name, error = %err, "invalid topology — skipping");
                continue;
            }
        };

        if orchestrator.setup(&placement).await {
            run_harness(bundle, name).await;
        } else {
            warn!(setup = %name, "cluster setup failed — skipping test run");
        }

        orchestrator.teardown(hosts).await;
    }

    orchestrator.full_clean(hosts).await;
    info!(setups = config.setups.len(), "all setups processed");
    Ok(())
}

/// Hand a provisioned cluster to the external test harness.
///
/// The harness owns test selection, timeouts, and result collection; a
/// nonzero exit here never aborts the remaining setups.
async fn run_harness(bundle: &BundleConfig, setup: &str) {
    let status = tokio::process::Command::new(bundle.harness_path())
        .arg(setup)
        .current_dir(&bundle.staging_dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => info!(setup, "test run finished"),
        Ok(status) => warn!(setup, code = ?status.code(), "test run exited nonzero"),
        Err(err) => warn!(setup, error = %err, "could not start test harness"),
    }
}
