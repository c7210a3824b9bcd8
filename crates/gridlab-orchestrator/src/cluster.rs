//! Cluster lifecycle orchestration.
//!
//! `setup` walks a placement through three barriers: best-effort cleanup
//! on every host, shared-state preparation, then one provisioning task
//! per instance pushed through a bounded worker pool. The pool cap is
//! independent of cluster size; tasks of both roles run interleaved, and
//! the server-side rendezvous is the only cross-instance ordering.
//!
//! A single failed task fails the whole setup. There is no partial
//! rollback — callers tear down unconditionally afterward, and teardown
//! never reports an error.

use std::sync::Arc;

use gridlab_core::{BundleConfig, Host};
use gridlab_exec::CommandRunner;
use gridlab_topology::Placement;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cleanup::{cleanup_host, full_clean_host, mkdir_state_argv};
use crate::provision::{provision_agent, provision_server};

/// Drives cleanup, artifact distribution, and provisioning stages over a
/// host list, aggregating per-task results into one verdict.
pub struct ClusterOrchestrator<R> {
    runner: Arc<R>,
    bundle: Arc<BundleConfig>,
}

impl<R: CommandRunner> ClusterOrchestrator<R> {
    pub fn new(runner: Arc<R>, bundle: BundleConfig) -> Self {
        Self {
            runner,
            bundle: Arc::new(bundle),
        }
    }

    /// Bring up every instance of a placement.
    ///
    /// Returns `true` only if every launch and every rendezvous
    /// succeeded. A cluster whose setup returned `false` must not be
    /// used; tear it down instead.
    pub async fn setup(&self, placement: &Placement) -> bool {
        let host_names: Vec<String> = placement
            .hosts
            .iter()
            .map(|hp| hp.host.name.clone())
            .collect();

        // Stage 1 — defensive cleanup, all hosts concurrently.
        self.cleanup_hosts(&host_names).await;

        // Stage 2 — shared state root on every host.
        for host in &host_names {
            if !self
                .runner
                .run(host, &mkdir_state_argv(&self.bundle))
                .await
            {
                warn!(host = %host, "could not create state root");
            }
        }

        // Stage 3 — provisioning fan-out through the bounded pool.
        let placement = Arc::new(placement.clone());
        let semaphore = Arc::new(Semaphore::new(self.bundle.pool_size));
        let mut tasks: JoinSet<bool> = JoinSet::new();

        for (hi, hp) in placement.hosts.iter().enumerate() {
            for ai in 0..hp.agents.len() {
                let runner = self.runner.clone();
                let bundle = self.bundle.clone();
                let placement = placement.clone();
                let semaphore = semaphore.clone();
                tasks.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return false;
                    };
                    let agent = &placement.hosts[hi].agents[ai];
                    provision_agent(runner.as_ref(), &bundle, &placement, agent).await
                });
            }
        }
        for (hi, hp) in placement.hosts.iter().enumerate() {
            for si in 0..hp.servers.len() {
                let runner = self.runner.clone();
                let bundle = self.bundle.clone();
                let placement = placement.clone();
                let semaphore = semaphore.clone();
                tasks.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return false;
                    };
                    let server = &placement.hosts[hi].servers[si];
                    provision_server(runner.as_ref(), &bundle, &placement, server).await
                });
            }
        }

        let mut ok = true;
        while let Some(result) = tasks.join_next().await {
            ok &= result.unwrap_or(false);
        }

        if ok {
            info!(
                instances = placement.instance_count(),
                hosts = placement.hosts.len(),
                "cluster provisioned"
            );
        } else {
            warn!("cluster setup failed");
        }
        ok
    }

    /// Remove this system's containers and state from every host.
    ///
    /// Best-effort and idempotent; never reports an error.
    pub async fn teardown(&self, hosts: &[Host]) {
        let names: Vec<String> = hosts.iter().map(|h| h.name.clone()).collect();
        self.cleanup_hosts(&names).await;
    }

    /// Teardown plus removal of the loaded runtime image on every host.
    pub async fn full_clean(&self, hosts: &[Host]) {
        let mut tasks = JoinSet::new();
        for host in hosts {
            let runner = self.runner.clone();
            let bundle = self.bundle.clone();
            let host = host.name.clone();
            tasks.spawn(async move {
                full_clean_host(runner.as_ref(), &bundle, &host).await;
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    /// Stage the bundle on every host, in parallel.
    ///
    /// A host that fails distribution is reported but does not stop the
    /// others; its instances will fail to launch later instead.
    pub async fn distribute_bundle(&self, hosts: &[Host]) -> bool {
        let mut tasks: JoinSet<bool> = JoinSet::new();
        for host in hosts {
            let runner = self.runner.clone();
            let bundle = self.bundle.clone();
            let host = host.name.clone();
            tasks.spawn(
                async move { gridlab_exec::distribute(runner.as_ref(), &host, &bundle).await },
            );
        }

        let mut ok = true;
        while let Some(result) = tasks.join_next().await {
            ok &= result.unwrap_or(false);
        }
        ok
    }

    async fn cleanup_hosts(&self, hosts: &[String]) {
        let mut tasks = JoinSet::new();
        for host in hosts {
            let runner = self.runner.clone();
            let bundle = self.bundle.clone();
            let host = host.clone();
            tasks.spawn(async move {
                cleanup_host(runner.as_ref(), &bundle, &host).await;
            });
        }
        while tasks.join_next().await.is_some() {}
    }
}
