//! Executor error types.

use thiserror::Error;

/// Errors from a captured command invocation.
///
/// Only enumeration-style calls surface these; plain `run` calls fold
/// every failure into `false` at the call site.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with status {code:?}")]
    NonZero { command: String, code: Option<i32> },
}
