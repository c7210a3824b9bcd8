//! Best-effort host cleanup.
//!
//! Cleanup never gates anything: every failure is logged and swallowed.
//! It runs defensively before provisioning and again after a topology's
//! test run completes, so it must be idempotent — a host with nothing to
//! clean reports no error and loses nothing but the state subtree.

use std::path::Path;

use gridlab_core::BundleConfig;
use gridlab_exec::CommandRunner;
use tracing::{debug, info};

/// `<runtime> ps --all --quiet --filter label=<tag>=1` argv.
pub fn ps_argv(bundle: &BundleConfig) -> Vec<String> {
    vec![
        bundle.runtime.clone(),
        "ps".to_string(),
        "--all".to_string(),
        "--quiet".to_string(),
        "--filter".to_string(),
        bundle.label_filter(),
    ]
}

/// `<runtime> rm --volumes --force --ignore <ids...>` argv.
pub fn rm_argv(bundle: &BundleConfig, ids: &[String]) -> Vec<String> {
    let mut argv = vec![
        bundle.runtime.clone(),
        "rm".to_string(),
        "--volumes".to_string(),
        "--force".to_string(),
        "--ignore".to_string(),
    ];
    argv.extend_from_slice(ids);
    argv
}

/// Throwaway helper container that wipes the shared state subtree.
///
/// Mounts the state root's parent so the subtree itself can be removed;
/// instance containers only ever see the subtree.
pub fn wipe_argv(bundle: &BundleConfig) -> Vec<String> {
    let parent = bundle
        .state_root
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("/"));
    let name = bundle
        .state_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    vec![
        bundle.runtime.clone(),
        "run".to_string(),
        "--network".to_string(),
        "host".to_string(),
        "--rm".to_string(),
        "--label".to_string(),
        bundle.label_value(),
        "--volume".to_string(),
        format!("{}:/scratch", parent.to_string_lossy()),
        bundle.helper_image.clone(),
        "rm".to_string(),
        "-rf".to_string(),
        format!("/scratch/{name}"),
    ]
}

/// `<runtime> rmi --force <tag>` argv.
pub fn rmi_argv(bundle: &BundleConfig) -> Vec<String> {
    vec![
        bundle.runtime.clone(),
        "rmi".to_string(),
        "--force".to_string(),
        bundle.image_tag.clone(),
    ]
}

/// `mkdir -p <state-root>` argv.
pub fn mkdir_state_argv(bundle: &BundleConfig) -> Vec<String> {
    vec![
        "mkdir".to_string(),
        "-p".to_string(),
        bundle.state_root.to_string_lossy().into_owned(),
    ]
}

/// Remove this system's containers and state subtree from one host.
pub async fn cleanup_host<R: CommandRunner>(runner: &R, bundle: &BundleConfig, host: &str) {
    info!(host, "cleaning previous containers");

    match runner.output(host, &ps_argv(bundle)).await {
        Ok(listing) => {
            let ids: Vec<String> = listing
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
            if !ids.is_empty() {
                debug!(host, containers = ids.len(), "removing tagged containers");
                runner.run(host, &rm_argv(bundle, &ids)).await;
            }
        }
        Err(err) => {
            debug!(host, error = %err, "container enumeration failed — nothing to clean");
        }
    }

    runner.run(host, &wipe_argv(bundle)).await;
}

/// Cleanup plus removal of the loaded runtime image.
pub async fn full_clean_host<R: CommandRunner>(runner: &R, bundle: &BundleConfig, host: &str) {
    info!(host, "cleaning system");
    cleanup_host(runner, bundle, host).await;
    runner.run(host, &rmi_argv(bundle)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps_argv_filters_by_label() {
        let bundle = BundleConfig::default();
        assert_eq!(
            ps_argv(&bundle),
            vec!["podman", "ps", "--all", "--quiet", "--filter", "label=gridlab=1"]
        );
    }

    #[test]
    fn rm_argv_appends_ids() {
        let bundle = BundleConfig::default();
        let argv = rm_argv(&bundle, &["abc".to_string(), "def".to_string()]);
        assert_eq!(
            argv,
            vec!["podman", "rm", "--volumes", "--force", "--ignore", "abc", "def"]
        );
    }

    #[test]
    fn wipe_argv_mounts_state_parent() {
        let bundle = BundleConfig::default();
        let argv = wipe_argv(&bundle);
        let joined = argv.join(" ");
        assert!(joined.contains("--volume /tmp:/scratch"));
        assert!(joined.ends_with("busybox:latest rm -rf /scratch/gridlab"));
    }

    #[test]
    fn rmi_argv_targets_the_loaded_tag() {
        let bundle = BundleConfig::default();
        assert_eq!(
            rmi_argv(&bundle),
            vec!["podman", "rmi", "--force", "gridlab:latest"]
        );
    }
}
