//! Error types for verifier operations.

use thiserror::Error;

/// Errors that make a check impossible to evaluate.
///
/// These are harness bugs (misaligned inputs), not protocol violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A crash schedule names a rank outside the topology.
    #[error("crash schedule names rank {rank} but there are only {peer_count} peers")]
    RankOutOfRange {
        /// Offending rank.
        rank: usize,
        /// Number of peers in the topology.
        peer_count: usize,
    },

    /// Expected and observed vectors have different lengths.
    #[error("expected {expected} values but observed {observed}")]
    LengthMismatch {
        /// Length of the expected vector.
        expected: usize,
        /// Length of the observed vector.
        observed: usize,
    },
}

/// Result type alias for verifier operations.
pub type Result<T> = std::result::Result<T, Error>;
