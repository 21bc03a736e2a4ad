//! Concurrent collector.
//!
//! Runs one [`PeerStreamReader`] per peer through [`parallel_join`] and
//! returns every peer's outcome. Readers share nothing mutable: each owns
//! its feed and its accepted events until the join hands them back.

use crate::error::{Error, Result};
use crate::join::parallel_join;
use crate::observation::ObservationResult;
use crate::predicate::StopPredicate;
use crate::reader::PeerStreamReader;
use crate::transport::LogTransport;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use vigil_events::{Classifier, PeerId};

/// Outcome of observing one peer.
#[derive(Debug)]
pub struct PeerOutcome {
    /// Index of the peer in the collected list.
    pub rank: usize,
    /// Observed peer.
    pub peer: PeerId,
    /// Observation or the failure attributed to this peer.
    pub result: Result<ObservationResult>,
}

/// Joined outcomes of one collection, in peer order.
#[derive(Debug)]
pub struct Collection {
    /// One outcome per peer.
    pub outcomes: Vec<PeerOutcome>,
}

impl Collection {
    /// Returns true if every reader finished without a transport failure.
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Returns the failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &PeerOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Unwraps the observations, surfacing the first failure in peer order.
    ///
    /// # Errors
    ///
    /// Returns the error of the lowest-ranked peer whose reader failed.
    pub fn into_results(self) -> Result<Vec<ObservationResult>> {
        self.outcomes.into_iter().map(|o| o.result).collect()
    }
}

/// Fans out one reader per peer and joins them.
#[derive(Clone)]
pub struct Collector {
    transport: Arc<dyn LogTransport>,
    classifier: Arc<Classifier>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

impl Collector {
    /// Creates a collector over `transport`.
    pub fn new(transport: Arc<dyn LogTransport>, classifier: Arc<Classifier>) -> Self {
        Self {
            transport,
            classifier,
        }
    }

    /// Returns a reader for a single peer sharing this collector's transport.
    pub fn reader(&self, peer: PeerId) -> PeerStreamReader {
        PeerStreamReader::new(
            peer,
            Arc::clone(&self.transport),
            Arc::clone(&self.classifier),
        )
    }

    /// Observes every peer concurrently.
    ///
    /// `predicate_for` is called once per peer with its rank, so a leader
    /// and its followers can wait for different things. Readers are not
    /// cancelled when a sibling fails; each runs to its own completion,
    /// feed end, or `deadline`.
    pub async fn collect<F>(
        &self,
        peers: &[PeerId],
        predicate_for: F,
        deadline: Option<Instant>,
    ) -> Collection
    where
        F: Fn(usize, &PeerId) -> StopPredicate,
    {
        info!(peers = peers.len(), "collecting observations");
        let tasks: Vec<_> = peers
            .iter()
            .enumerate()
            .map(|(rank, peer)| {
                let reader = self.reader(peer.clone());
                let predicate = predicate_for(rank, peer);
                async move { reader.observe(predicate, deadline).await }
            })
            .collect();

        let outcomes = parallel_join(tasks)
            .await
            .into_iter()
            .zip(peers.iter().enumerate())
            .map(|(joined, (rank, peer))| {
                let result = joined.unwrap_or_else(|e| {
                    Err(Error::ReaderAborted {
                        peer: peer.clone(),
                        message: e.to_string(),
                    })
                });
                if let Err(e) = &result {
                    warn!(%peer, error = %e, "reader failed");
                }
                PeerOutcome {
                    rank,
                    peer: peer.clone(),
                    result,
                }
            })
            .collect();

        Collection { outcomes }
    }
}
