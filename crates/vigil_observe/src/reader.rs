//! Peer stream reader.
//!
//! Drains one peer's live feed under a [`StopPredicate`] and always closes
//! the subscription before returning, whichever way reading stopped:
//! predicate satisfied, feed ended, deadline passed, or read error.

use crate::error::Result;
use crate::feed::EventFeed;
use crate::observation::{Completion, ObservationResult};
use crate::predicate::{Evaluator, Step, StopPredicate};
use crate::transport::LogTransport;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};
use vigil_events::{Classifier, PeerId};

/// Observes one peer.
#[derive(Clone)]
pub struct PeerStreamReader {
    peer: PeerId,
    transport: Arc<dyn LogTransport>,
    classifier: Arc<Classifier>,
}

impl std::fmt::Debug for PeerStreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerStreamReader")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl PeerStreamReader {
    /// Creates a reader for `peer`.
    pub fn new(
        peer: PeerId,
        transport: Arc<dyn LogTransport>,
        classifier: Arc<Classifier>,
    ) -> Self {
        Self {
            peer,
            transport,
            classifier,
        }
    }

    /// Returns the observed peer.
    pub const fn peer(&self) -> &PeerId {
        &self.peer
    }

    /// Opens a live feed and drains it under `predicate`.
    ///
    /// A predicate with a zero target completes without opening the feed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the feed cannot be opened,
    /// read or closed.
    pub async fn observe(
        &self,
        predicate: StopPredicate,
        deadline: Option<Instant>,
    ) -> Result<ObservationResult> {
        if predicate.is_satisfied(0) {
            return Ok(ObservationResult::new(
                self.peer.clone(),
                predicate,
                Vec::new(),
                Completion::Satisfied,
                0,
            ));
        }
        let feed = EventFeed::open(
            self.transport.as_ref(),
            self.peer.clone(),
            Arc::clone(&self.classifier),
        )
        .await?;
        observe_feed(feed, predicate, deadline).await
    }
}

/// Drains an already opened feed under `predicate`, then closes it.
///
/// # Errors
///
/// Returns [`crate::Error::Transport`] if reading or closing fails. A read
/// error takes precedence over a close error; the feed is closed either way.
pub async fn observe_feed(
    mut feed: EventFeed,
    predicate: StopPredicate,
    deadline: Option<Instant>,
) -> Result<ObservationResult> {
    let mut evaluator = Evaluator::new(predicate);
    let drained = drain(&mut feed, &mut evaluator, deadline).await;
    let closed = feed.close().await;
    let completion = drained?;
    closed?;

    let result = ObservationResult::new(
        feed.peer().clone(),
        predicate,
        evaluator.into_events(),
        completion,
        feed.lines_read(),
    );
    match completion {
        Completion::Satisfied => debug!(
            peer = %result.peer,
            kind = %predicate.kind(),
            accepted = result.len(),
            "observation complete"
        ),
        Completion::FeedEnded | Completion::TimedOut => warn!(
            peer = %result.peer,
            kind = %predicate.kind(),
            accepted = result.len(),
            target = predicate.target(),
            %completion,
            "short observation"
        ),
    }
    Ok(result)
}

async fn drain(
    feed: &mut EventFeed,
    evaluator: &mut Evaluator,
    deadline: Option<Instant>,
) -> Result<Completion> {
    if evaluator.is_satisfied() {
        return Ok(Completion::Satisfied);
    }
    loop {
        let next = match deadline {
            Some(deadline) => {
                match tokio::time::timeout_at(deadline, feed.next_event()).await {
                    Ok(next) => next?,
                    Err(_) => return Ok(Completion::TimedOut),
                }
            }
            None => feed.next_event().await?,
        };
        let Some(event) = next else {
            return Ok(Completion::FeedEnded);
        };
        if evaluator.offer(event) == Step::Complete {
            return Ok(Completion::Satisfied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, Tail};
    use std::time::Duration;
    use vigil_events::EventKind;

    fn reader(transport: ScriptedTransport, peer: &str) -> (PeerStreamReader, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let reader = PeerStreamReader::new(
            PeerId::new(peer),
            Arc::clone(&transport) as Arc<dyn LogTransport>,
            Arc::new(Classifier::standard()),
        );
        (reader, transport)
    }

    #[tokio::test]
    async fn interleaved_feed_yields_matching_events_and_closes_once() {
        let lines = [
            "I] delivering m1",
            "I] waiting for message",
            "I] delivering m2",
            "I] new view installed, viewId: 1",
            "I] delivering m3",
            "I] delivering m4",
        ];
        let (reader, transport) = reader(ScriptedTransport::default().script("p0", lines, Tail::Hang), "p0");

        let result = reader
            .observe(StopPredicate::count(EventKind::MessageDelivered, 3), None)
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.identities(), vec!["delivering m1", "delivering m2", "delivering m3"]);
        assert_eq!(result.lines_read, 5);
        assert_eq!(transport.tally("p0").closes(), 1);
    }

    #[tokio::test]
    async fn feed_ending_early_returns_partial_result() {
        let (reader, transport) = reader(
            ScriptedTransport::default().script("p1", ["I] delivering m1"], Tail::End),
            "p1",
        );

        let result = reader
            .observe(StopPredicate::count(EventKind::MessageDelivered, 2), None)
            .await
            .unwrap();

        assert_eq!(result.completion, Completion::FeedEnded);
        assert_eq!(result.len(), 1);
        assert_eq!(transport.tally("p1").closes(), 1);
    }

    #[tokio::test]
    async fn deadline_returns_partial_result() {
        let (reader, transport) = reader(
            ScriptedTransport::default().script("p2", ["I] Peer: 1 is not reachable"], Tail::Hang),
            "p2",
        );
        let deadline = Instant::now() + Duration::from_millis(50);

        let result = reader
            .observe(StopPredicate::count(EventKind::PeerUnreachable, 2), Some(deadline))
            .await
            .unwrap();

        assert_eq!(result.completion, Completion::TimedOut);
        assert_eq!(result.len(), 1);
        assert_eq!(transport.tally("p2").closes(), 1);
    }

    #[tokio::test]
    async fn read_error_still_closes_feed() {
        let (reader, transport) = reader(
            ScriptedTransport::default().script("p3", ["noise"], Tail::Fail),
            "p3",
        );

        let err = reader
            .observe(StopPredicate::first(EventKind::ViewInstalled), None)
            .await
            .unwrap_err();

        assert_eq!(err.peer().as_str(), "p3");
        assert_eq!(transport.tally("p3").closes(), 1);
    }

    #[tokio::test]
    async fn zero_target_never_opens_feed() {
        let (reader, transport) = reader(
            ScriptedTransport::default().script("p4", ["I] delivering m1"], Tail::Hang),
            "p4",
        );

        let result = reader
            .observe(StopPredicate::count(EventKind::MessageDelivered, 0), None)
            .await
            .unwrap();

        assert!(result.is_complete());
        assert!(result.is_empty());
        assert_eq!(transport.tally("p4").opens(), 0);
    }
}
