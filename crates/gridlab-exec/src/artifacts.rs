//! Artifact distribution — staging the deployable bundle on a host.
//!
//! A bundle reaches a host in two steps: copy the files into the same
//! staging path the controller uses (remote hosts only), then load the
//! image archive into the host's container runtime. Partial transfers
//! are not rolled back; a retried call overwrites what is there.

use gridlab_core::BundleConfig;
use tracing::{info, warn};

use crate::runner::CommandRunner;

/// Ensure the bundle exists on `host` and its image is loaded there.
///
/// Returns `false` as soon as any sub-step fails.
pub async fn distribute<R: CommandRunner>(runner: &R, host: &str, bundle: &BundleConfig) -> bool {
    if !runner.is_local(host) {
        let staging = bundle.staging_dir.to_string_lossy().into_owned();
        let mkdir = vec!["mkdir".to_string(), "-p".to_string(), staging];
        if !runner.run(host, &mkdir).await {
            warn!(host, "could not create staging directory");
            return false;
        }

        // scp runs on the controller, pushing toward the host.
        let scp = scp_argv(host, bundle);
        if !runner.run(runner.local_host(), &scp).await {
            warn!(host, "artifact copy failed");
            return false;
        }
    }

    let loaded = runner.run(host, &load_argv(bundle)).await;
    if loaded {
        info!(host, image = %bundle.image_tag, "bundle distributed");
    } else {
        warn!(host, image = %bundle.image_tag, "image load failed");
    }
    loaded
}

/// `scp -p <artifacts...> <host>:<staging-dir>` argv.
pub fn scp_argv(host: &str, bundle: &BundleConfig) -> Vec<String> {
    vec![
        "scp".to_string(),
        "-p".to_string(),
        bundle.archive_path().to_string_lossy().into_owned(),
        bundle.entrypoint_path().to_string_lossy().into_owned(),
        bundle.harness_path().to_string_lossy().into_owned(),
        format!("{}:{}", host, bundle.staging_dir.to_string_lossy()),
    ]
}

/// `<runtime> load -i <archive> <tag>` argv.
pub fn load_argv(bundle: &BundleConfig) -> Vec<String> {
    vec![
        bundle.runtime.clone(),
        "load".to_string(),
        "-i".to_string(),
        bundle.archive_path().to_string_lossy().into_owned(),
        bundle.image_tag.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scp_argv_lists_all_artifacts() {
        let bundle = BundleConfig::new("/stage/gridlab");
        let argv = scp_argv("hostb", &bundle);

        assert_eq!(argv[0], "scp");
        assert_eq!(argv[1], "-p");
        assert!(argv.contains(&"/stage/gridlab/gridlab.tgz".to_string()));
        assert!(argv.contains(&"/stage/gridlab/entrypoint".to_string()));
        assert!(argv.contains(&"/stage/gridlab/run-test.sh".to_string()));
        assert_eq!(argv.last().unwrap(), "hostb:/stage/gridlab");
    }

    #[test]
    fn load_argv_names_archive_and_tag() {
        let bundle = BundleConfig::new("/stage/gridlab");
        assert_eq!(
            load_argv(&bundle),
            vec![
                "podman".to_string(),
                "load".to_string(),
                "-i".to_string(),
                "/stage/gridlab/gridlab.tgz".to_string(),
                "gridlab:latest".to_string(),
            ]
        );
    }
}
