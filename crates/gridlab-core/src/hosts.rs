//! Host list handling — nodes file parsing and name resolution.
//!
//! Hosts arrive as a newline-delimited file of host names. The order of
//! that file is significant: it drives round-robin placement, so it is
//! preserved end to end.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, bail};
use tracing::debug;

/// A physical host that can run instance containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Resolved network name, as listed in the nodes file.
    pub name: String,
    /// Canonical address, used for container host aliases.
    pub addr: IpAddr,
}

/// Read the newline-delimited nodes file, skipping blank lines.
///
/// Fails if the file is missing or lists no hosts.
pub fn read_nodes_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read nodes file {}", path.display()))?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        bail!("no hosts defined in nodes file {}", path.display());
    }
    Ok(names)
}

/// Resolve each host name to an address, preserving input order.
pub async fn resolve_hosts(names: &[String]) -> anyhow::Result<Vec<Host>> {
    let mut hosts = Vec::with_capacity(names.len());
    for name in names {
        // lookup_host needs a port; it is discarded.
        let addr = tokio::net::lookup_host((name.as_str(), 0))
            .await
            .with_context(|| format!("could not resolve host {name}"))?
            .next()
            .with_context(|| format!("no address for host {name}"))?
            .ip();
        debug!(host = %name, %addr, "resolved host");
        hosts.push(Host {
            name: name.clone(),
            addr,
        });
    }
    Ok(hosts)
}

/// The local machine's host name, as the kernel reports it.
pub fn local_hostname() -> String {
    let mut buf = [0u8; 256];
    // SAFETY: buf is a valid writable buffer of the length passed.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc == 0 {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        if let Ok(name) = std::str::from_utf8(&buf[..end]) {
            return name.to_string();
        }
    }
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// Whether two host names refer to the same machine.
///
/// Nodes files may carry fully-qualified names while the kernel reports a
/// short one (or vice versa), so names match if their first labels do.
pub fn same_host(a: &str, b: &str) -> bool {
    fn short(name: &str) -> &str {
        name.split('.').next().unwrap_or(name)
    }
    a == b || short(a) == short(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_file_skips_blank_lines() {
        let dir = std::env::temp_dir().join("gridlab-core-nodes-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("nodes");
        std::fs::write(&path, "hosta\n\n  hostb.example.com  \n\n").unwrap();

        let names = read_nodes_file(&path).unwrap();
        assert_eq!(names, vec!["hosta", "hostb.example.com"]);
    }

    #[test]
    fn empty_nodes_file_is_an_error() {
        let dir = std::env::temp_dir().join("gridlab-core-nodes-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("nodes-empty");
        std::fs::write(&path, "\n  \n").unwrap();

        assert!(read_nodes_file(&path).is_err());
    }

    #[test]
    fn same_host_matches_short_and_fqdn() {
        assert!(same_host("hosta", "hosta"));
        assert!(same_host("hosta", "hosta.example.com"));
        assert!(same_host("hosta.example.com", "hosta"));
        assert!(!same_host("hosta", "hostb"));
        assert!(!same_host("hosta.example.com", "hostb.example.com"));
    }
}
