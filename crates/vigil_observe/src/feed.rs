//! Classified event feed over one live subscription.

use crate::error::{Error, Result};
use crate::transport::{LogSubscription, LogTransport};
use std::sync::Arc;
use tracing::trace;
use vigil_events::{Classifier, LogEvent, PeerId};

/// Lazy, non-restartable sequence of classified events from one peer.
///
/// Reading is destructive: once [`EventFeed::next_event`] has returned an
/// event, this feed will not yield it again. The feed owns its subscription
/// and is the only thing allowed to close it.
pub struct EventFeed {
    peer: PeerId,
    classifier: Arc<Classifier>,
    subscription: Box<dyn LogSubscription>,
    lines_read: usize,
    closed: bool,
}

impl std::fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("peer", &self.peer)
            .field("lines_read", &self.lines_read)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl EventFeed {
    /// Wraps an already opened subscription.
    pub fn new(
        peer: PeerId,
        classifier: Arc<Classifier>,
        subscription: Box<dyn LogSubscription>,
    ) -> Self {
        Self {
            peer,
            classifier,
            subscription,
            lines_read: 0,
            closed: false,
        }
    }

    /// Opens a live feed for `peer` through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the subscription cannot be opened.
    pub async fn open(
        transport: &dyn LogTransport,
        peer: PeerId,
        classifier: Arc<Classifier>,
    ) -> Result<Self> {
        let subscription = transport.live_log(&peer).await?;
        Ok(Self::new(peer, classifier, subscription))
    }

    /// Returns the peer this feed observes.
    pub const fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Returns how many raw lines have been read so far.
    pub const fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Returns true once the subscription has been released.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reads and classifies the next line.
    ///
    /// Unclassified lines are returned too; filtering is the predicate's
    /// job. Returns `Ok(None)` when the feed has ended or was closed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if reading fails.
    pub async fn next_event(&mut self) -> Result<Option<LogEvent>> {
        if self.closed {
            return Ok(None);
        }
        let line = self
            .subscription
            .next_line()
            .await
            .map_err(|e| Error::transport(&self.peer, e))?;
        Ok(line.map(|line| {
            self.lines_read += 1;
            let event = self.classifier.classify(&self.peer, &line);
            trace!(peer = %self.peer, kind = %event.kind, "read line");
            event
        }))
    }

    /// Releases the subscription. Only the first call reaches the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the transport fails to tear down.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.subscription
            .close()
            .await
            .map_err(|e| Error::transport(&self.peer, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedSubscription;
    use vigil_events::EventKind;

    #[tokio::test]
    async fn classifies_in_arrival_order_then_ends() {
        let (sub, _tally) = ScriptedSubscription::new(["a] delivering 1", "noise", "a] delivering 2"]);
        let mut feed = EventFeed::new(PeerId::new("p"), Arc::new(Classifier::standard()), Box::new(sub));

        let first = feed.next_event().await.unwrap().unwrap();
        assert_eq!(first.field.as_deref(), Some("delivering 1"));
        let second = feed.next_event().await.unwrap().unwrap();
        assert_eq!(second.kind, EventKind::Unclassified);
        let third = feed.next_event().await.unwrap().unwrap();
        assert_eq!(third.field.as_deref(), Some("delivering 2"));
        assert!(feed.next_event().await.unwrap().is_none());
        assert_eq!(feed.lines_read(), 3);
    }

    #[tokio::test]
    async fn close_reaches_transport_once() {
        let (sub, tally) = ScriptedSubscription::new(["x"]);
        let mut feed = EventFeed::new(PeerId::new("p"), Arc::new(Classifier::standard()), Box::new(sub));
        feed.close().await.unwrap();
        feed.close().await.unwrap();
        assert_eq!(tally.closes(), 1);
        assert!(feed.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_errors_name_the_peer() {
        let (sub, _tally) = ScriptedSubscription::failing(["x"]);
        let mut feed = EventFeed::new(PeerId::new("p7"), Arc::new(Classifier::standard()), Box::new(sub));
        feed.next_event().await.unwrap();
        let err = feed.next_event().await.unwrap_err();
        assert_eq!(err.peer().as_str(), "p7");
    }
}
