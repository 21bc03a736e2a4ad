//! Stopping predicates.
//!
//! A predicate is a counting policy over one event kind. Events of other
//! kinds are observed but neither counted nor retained, so the accepted
//! list only ever holds the kind whose relative order is being checked.

use serde::Serialize;
use vigil_events::{EventKind, LogEvent};

/// When a peer's observation is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum StopPredicate {
    /// Keep accepting until `kind` has occurred `target` times.
    Count {
        /// Kind that counts.
        kind: EventKind,
        /// Occurrences required.
        target: usize,
    },
    /// Stop at the first occurrence of `kind`.
    First {
        /// Kind to wait for.
        kind: EventKind,
    },
}

/// Outcome of offering one event to a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Event was of another kind; ignored.
    Skip,
    /// Event accepted; more are needed.
    Continue,
    /// Event accepted; the target has been reached.
    Complete,
}

impl StopPredicate {
    /// "N occurrences of kind K".
    #[must_use]
    pub const fn count(kind: EventKind, target: usize) -> Self {
        Self::Count { kind, target }
    }

    /// "First occurrence of kind K".
    #[must_use]
    pub const fn first(kind: EventKind) -> Self {
        Self::First { kind }
    }

    /// Returns the kind this predicate counts.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match *self {
            Self::Count { kind, .. } | Self::First { kind } => kind,
        }
    }

    /// Returns how many matching events complete the observation.
    #[must_use]
    pub const fn target(&self) -> usize {
        match *self {
            Self::Count { target, .. } => target,
            Self::First { .. } => 1,
        }
    }

    /// Returns true once `accepted` matching events satisfy the predicate.
    #[must_use]
    pub const fn is_satisfied(&self, accepted: usize) -> bool {
        accepted >= self.target()
    }

    /// Evaluates `event` given `accepted` matching events seen before it.
    #[must_use]
    pub fn evaluate(&self, accepted: usize, event: &LogEvent) -> Step {
        if event.kind != self.kind() {
            Step::Skip
        } else if self.is_satisfied(accepted + 1) {
            Step::Complete
        } else {
            Step::Continue
        }
    }

    /// Returns true while the observation should keep reading.
    #[must_use]
    pub fn keep_going(&self, accepted: usize, event: &LogEvent) -> bool {
        self.evaluate(accepted, event) != Step::Complete
    }
}

/// Accumulates the events a predicate accepts for one peer.
#[derive(Debug, Clone)]
pub struct Evaluator {
    predicate: StopPredicate,
    accepted: Vec<LogEvent>,
}

impl Evaluator {
    /// Creates an empty evaluator.
    #[must_use]
    pub const fn new(predicate: StopPredicate) -> Self {
        Self {
            predicate,
            accepted: Vec::new(),
        }
    }

    /// Returns the predicate being evaluated.
    pub const fn predicate(&self) -> &StopPredicate {
        &self.predicate
    }

    /// Returns the number of accepted events.
    pub fn accepted(&self) -> usize {
        self.accepted.len()
    }

    /// Returns true once nothing more is needed.
    pub fn is_satisfied(&self) -> bool {
        self.predicate.is_satisfied(self.accepted.len())
    }

    /// Offers the next event in arrival order.
    ///
    /// Once satisfied, further events are skipped so the accepted count
    /// never exceeds the target.
    pub fn offer(&mut self, event: LogEvent) -> Step {
        if self.is_satisfied() {
            return Step::Skip;
        }
        let step = self.predicate.evaluate(self.accepted.len(), &event);
        if step != Step::Skip {
            self.accepted.push(event);
        }
        step
    }

    /// Consumes the evaluator, returning accepted events in arrival order.
    #[must_use]
    pub fn into_events(self) -> Vec<LogEvent> {
        self.accepted
    }
}
