//! Error types for scenario runs.

use std::path::PathBuf;
use thiserror::Error;
use vigil_events::PeerId;

/// Reasons a scenario or harness configuration is rejected.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// No hosts were configured.
    #[error("no hosts configured")]
    NoHosts,

    /// The same host appears twice.
    #[error("host {0} is listed more than once")]
    DuplicateHost(String),

    /// Drop rate outside `[0, 1]`.
    #[error("drop rate {0} is outside [0, 1]")]
    DropRate(f64),

    /// A sender is not one of the hosts.
    #[error("sender {0} is not a configured host")]
    UnknownSender(String),

    /// A crash step names a rank outside the topology.
    #[error("crash schedule names rank {rank} but there are only {peer_count} peers")]
    CrashRank {
        /// Offending rank.
        rank: usize,
        /// Number of peers.
        peer_count: usize,
    },

    /// A crash step stops a peer that was already stopped.
    #[error("crash schedule stops rank {0} twice")]
    RepeatedCrash(usize),

    /// A crash step waits on the leader after stopping it.
    #[error("crash step waits for the leader after the leader was stopped")]
    LeaderWaitsOnItself,

    /// The scenario needs more peers than configured.
    #[error("scenario {scenario} needs at least {needed} hosts, found {found}")]
    TooFewHosts {
        /// Scenario name.
        scenario: &'static str,
        /// Minimum host count.
        needed: usize,
        /// Configured host count.
        found: usize,
    },

    /// No scenario has this name.
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Errors that can abort a scenario run.
#[derive(Debug, Error)]
pub enum Error {
    /// The scenario or harness configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The marker table is unusable.
    #[error("invalid marker table: {0}")]
    Markers(#[from] vigil_events::Error),

    /// A fleet command failed; the case cannot continue.
    #[error("fleet precondition failed: {0}")]
    Fleet(#[from] vigil_fleet::Error),

    /// Reading a peer's log failed.
    #[error(transparent)]
    Transport(#[from] vigil_observe::Error),

    /// A launched peer never showed up as running.
    #[error("peer {peer} not running after {attempts} polls")]
    StartupTimeout {
        /// Peer that did not start.
        peer: PeerId,
        /// Polls made.
        attempts: u32,
    },

    /// Verification inputs were misaligned.
    #[error("verification could not run: {0}")]
    Verification(#[from] vigil_verifier::Error),
}

/// Result type alias for scenario operations.
pub type Result<T> = std::result::Result<T, Error>;
