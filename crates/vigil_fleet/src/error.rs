//! Error types for fleet operations.

use thiserror::Error;
use vigil_events::PeerId;

/// Errors that can occur while driving a fleet.
///
/// Every one of these is a precondition failure for the test case that
/// triggered it. Nothing is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// A fleet command exited with a non-zero status.
    #[error("{action} {target} failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        /// What the command was doing (`launch`, `stop`, ...).
        action: &'static str,
        /// Peer or pattern the command targeted.
        target: String,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The command could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Local I/O failed (log directories, pipes).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The fleet has no peer by that name.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),
}

/// Result type alias for fleet operations.
pub type Result<T> = std::result::Result<T, Error>;
