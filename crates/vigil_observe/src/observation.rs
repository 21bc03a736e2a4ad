//! Observation results.

use crate::predicate::StopPredicate;
use serde::Serialize;
use std::fmt;
use vigil_events::{LogEvent, PeerId};

/// Why an observation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The predicate was satisfied.
    Satisfied,
    /// The feed ended first (peer stopped or crashed).
    FeedEnded,
    /// The scenario deadline passed first.
    TimedOut,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satisfied => write!(f, "satisfied"),
            Self::FeedEnded => write!(f, "feed ended"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Events accepted for one peer during one scenario step.
///
/// A short result is never padded: `events.len() < predicate.target()`
/// exactly when `completion` is not [`Completion::Satisfied`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservationResult {
    /// Observed peer.
    pub peer: PeerId,
    /// Predicate the observation ran under.
    pub predicate: StopPredicate,
    /// Accepted events in arrival order.
    pub events: Vec<LogEvent>,
    /// Why reading stopped.
    pub completion: Completion,
    /// Raw lines consumed, matching or not.
    pub lines_read: usize,
}

impl ObservationResult {
    /// Creates a result.
    #[must_use]
    pub const fn new(
        peer: PeerId,
        predicate: StopPredicate,
        events: Vec<LogEvent>,
        completion: Completion,
        lines_read: usize,
    ) -> Self {
        Self {
            peer,
            predicate,
            events,
            completion,
            lines_read,
        }
    }

    /// Returns true if the predicate was satisfied.
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Satisfied
    }

    /// Returns the number of accepted events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was accepted.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the target count of the predicate.
    pub const fn target(&self) -> usize {
        self.predicate.target()
    }

    /// Returns the comparison identities of accepted events, in order.
    pub fn identities(&self) -> Vec<&str> {
        self.events.iter().map(LogEvent::identity).collect()
    }
}
