//! Transport seam between the observation engine and a process fleet.

use crate::error::Result;
use async_trait::async_trait;
use vigil_events::PeerId;

/// One live subscription to a peer's log.
///
/// A subscription replays the peer's log from its start and then follows
/// it. It ends (`Ok(None)`) once the peer has stopped and every buffered
/// line has been read.
#[async_trait]
pub trait LogSubscription: Send {
    /// Waits for the next raw line.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying stream fails.
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;

    /// Releases the subscription.
    ///
    /// Must be idempotent. Implementations should also release on drop so
    /// a cancelled reader never leaks a live connection.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if tearing the stream down fails.
    async fn close(&mut self) -> std::io::Result<()>;
}

/// Source of live and historical peer logs.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Attaches a live subscription to `peer`'s log.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the subscription cannot be opened.
    async fn live_log(&self, peer: &PeerId) -> Result<Box<dyn LogSubscription>>;

    /// Returns the peer's log as it stands now.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the log cannot be retrieved.
    async fn historical_log(&self, peer: &PeerId) -> Result<Vec<String>>;
}
