//! Error types for observation.

use thiserror::Error;
use vigil_events::PeerId;

/// Boxed error carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while observing a peer.
///
/// Every variant names the peer it happened on.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening, reading or closing a log feed failed.
    #[error("transport failure on {peer}: {source}")]
    Transport {
        /// Peer whose feed failed.
        peer: PeerId,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// The reader task for a peer panicked or was aborted.
    #[error("reader for {peer} did not finish: {message}")]
    ReaderAborted {
        /// Peer the reader was observing.
        peer: PeerId,
        /// Join failure description.
        message: String,
    },
}

impl Error {
    /// Creates a transport error for `peer`.
    pub fn transport(peer: &PeerId, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            peer: peer.clone(),
            source: source.into(),
        }
    }

    /// Returns the peer the error is attributed to.
    #[must_use]
    pub fn peer(&self) -> &PeerId {
        match self {
            Self::Transport { peer, .. } | Self::ReaderAborted { peer, .. } => peer,
        }
    }
}

/// Result type alias for observation operations.
pub type Result<T> = std::result::Result<T, Error>;
