//! Deployable bundle description.
//!
//! A bundle is the set of artifacts staged on every host (runtime image
//! archive, container entrypoint, test-harness script) plus the container
//! runtime knobs used to run them. All values have working defaults; only
//! the staging directory is caller-supplied.

use std::path::{Path, PathBuf};

/// Everything the executor and orchestrator need to know about the
/// deployable bundle and the container runtime it is loaded into.
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Container runtime binary.
    pub runtime: String,
    /// Image tag the archive is loaded as.
    pub image_tag: String,
    /// Image archive file name inside the staging directory.
    pub image_archive: String,
    /// Container entrypoint file name inside the staging directory.
    pub entrypoint: String,
    /// Test-harness script file name inside the staging directory.
    pub harness: String,
    /// Label key applied to every container this system starts.
    pub label: String,
    /// Directory holding the bundle, mirrored to the same path on every host.
    pub staging_dir: PathBuf,
    /// Shared per-host working directory for instance state.
    pub state_root: PathBuf,
    /// Mount point of the state root inside instance containers.
    pub state_mount: PathBuf,
    /// Image used for the throwaway cleanup container.
    pub helper_image: String,
    /// Configuration profile passed to every instance entrypoint.
    pub profile: String,
    /// Concurrency cap of the provisioning worker pool.
    pub pool_size: usize,
}

impl BundleConfig {
    /// A bundle rooted at the given staging directory, defaults elsewhere.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime: "podman".to_string(),
            image_tag: "gridlab:latest".to_string(),
            image_archive: "gridlab.tgz".to_string(),
            entrypoint: "entrypoint".to_string(),
            harness: "run-test.sh".to_string(),
            label: "gridlab".to_string(),
            staging_dir: staging_dir.into(),
            state_root: PathBuf::from("/tmp/gridlab"),
            state_mount: PathBuf::from("/var/lib/gridlab"),
            helper_image: "busybox:latest".to_string(),
            profile: "default".to_string(),
            pool_size: 10,
        }
    }

    /// Path of the image archive inside the staging directory.
    pub fn archive_path(&self) -> PathBuf {
        self.staging_dir.join(&self.image_archive)
    }

    /// Path of the container entrypoint inside the staging directory.
    pub fn entrypoint_path(&self) -> PathBuf {
        self.staging_dir.join(&self.entrypoint)
    }

    /// Path of the test-harness script inside the staging directory.
    pub fn harness_path(&self) -> PathBuf {
        self.staging_dir.join(&self.harness)
    }

    /// The `key=1` label value applied to containers.
    pub fn label_value(&self) -> String {
        format!("{}=1", self.label)
    }

    /// The `label=key=1` filter matching containers we started.
    pub fn label_filter(&self) -> String {
        format!("label={}=1", self.label)
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self::new(Path::new("."))
    }
}
