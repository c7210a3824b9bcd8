//! Command execution — the one seam between GridLab and the hosts.

use std::future::Future;
use std::process::Stdio;

use gridlab_core::same_host;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::ExecError;

/// Runs an argv on a host and reports only whether it succeeded.
///
/// Injected everywhere a host is touched, so orchestration logic can be
/// exercised against a scripted implementation without spawning a
/// single process.
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `argv` on `host`, discarding all output.
    ///
    /// One attempt, one spawned process, no retries. Returns `true` iff
    /// the process exits with status 0; spawn failures are `false`.
    fn run(&self, host: &str, argv: &[String]) -> impl Future<Output = bool> + Send;

    /// Run `argv` on `host`, capturing stdout.
    ///
    /// Used only where the caller must read the result back (container
    /// enumeration). An `Err` is recoverable and callers decide what it
    /// means — during cleanup it reads as "nothing to clean".
    fn output(&self, host: &str, argv: &[String])
    -> impl Future<Output = Result<String, ExecError>> + Send;

    /// The host name this process runs on.
    fn local_host(&self) -> &str;

    /// Whether `host` is this machine (no remote wrapping needed).
    fn is_local(&self, host: &str) -> bool {
        same_host(host, self.local_host())
    }
}

/// Wrap an argv for execution on a remote host.
pub fn remote_argv(host: &str, argv: &[String]) -> Vec<String> {
    let mut wrapped = Vec::with_capacity(argv.len() + 2);
    wrapped.push("ssh".to_string());
    wrapped.push(host.to_string());
    wrapped.extend_from_slice(argv);
    wrapped
}

/// The production runner: spawns processes, wrapping non-local targets
/// in `ssh <host> ...` with the exit code propagated back.
pub struct ShellRunner {
    local: String,
}

impl ShellRunner {
    /// A runner that treats `local_host` as this machine.
    pub fn new(local_host: impl Into<String>) -> Self {
        Self {
            local: local_host.into(),
        }
    }

    fn effective_argv(&self, host: &str, argv: &[String]) -> Vec<String> {
        if self.is_local(host) {
            argv.to_vec()
        } else {
            remote_argv(host, argv)
        }
    }
}

impl CommandRunner for ShellRunner {
    async fn run(&self, host: &str, argv: &[String]) -> bool {
        let argv = self.effective_argv(host, argv);
        let Some((program, args)) = argv.split_first() else {
            return false;
        };
        trace!(host, command = %argv.join(" "), "running command");

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(err) => {
                debug!(host, program = %program, error = %err, "spawn failed");
                false
            }
        }
    }

    async fn output(&self, host: &str, argv: &[String]) -> Result<String, ExecError> {
        let argv = self.effective_argv(host, argv);
        let Some((program, args)) = argv.split_first() else {
            return Err(ExecError::EmptyCommand);
        };

        let out = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                command: program.clone(),
                source,
            })?;

        if !out.status.success() {
            return Err(ExecError::NonZero {
                command: program.clone(),
                code: out.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    fn local_host(&self) -> &str {
        &self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn remote_argv_prefixes_ssh() {
        let wrapped = remote_argv("hostb", &argv(&["mkdir", "-p", "/tmp/gridlab"]));
        assert_eq!(wrapped, argv(&["ssh", "hostb", "mkdir", "-p", "/tmp/gridlab"]));
    }

    #[test]
    fn local_target_is_not_wrapped() {
        let runner = ShellRunner::new("hosta.example.com");
        assert_eq!(
            runner.effective_argv("hosta", &argv(&["true"])),
            argv(&["true"])
        );
        assert_eq!(
            runner.effective_argv("hostb", &argv(&["true"]))[0],
            "ssh".to_string()
        );
    }

    #[tokio::test]
    async fn run_reports_exit_status() {
        let runner = ShellRunner::new("local");
        assert!(runner.run("local", &argv(&["true"])).await);
        assert!(!runner.run("local", &argv(&["false"])).await);
    }

    #[tokio::test]
    async fn run_of_missing_binary_is_false() {
        let runner = ShellRunner::new("local");
        assert!(
            !runner
                .run("local", &argv(&["gridlab-no-such-binary"]))
                .await
        );
    }

    #[tokio::test]
    async fn output_captures_stdout() {
        let runner = ShellRunner::new("local");
        let out = runner
            .output("local", &argv(&["echo", "abc123"]))
            .await
            .unwrap();
        assert_eq!(out.trim(), "abc123");
    }

    #[tokio::test]
    async fn output_of_failing_command_is_an_error() {
        let runner = ShellRunner::new("local");
        assert!(runner.output("local", &argv(&["false"])).await.is_err());
    }
}
