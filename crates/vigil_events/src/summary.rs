//! Per-kind counts and an order-independent fingerprint of an event set.

use crate::model::{EventKind, LogEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use xxhash_rust::xxh64::xxh64;

/// Summary of a classified event multiset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    /// Number of events per kind.
    pub counts: BTreeMap<EventKind, usize>,
    /// Order-independent fingerprint of the multiset of (kind, identity).
    pub fingerprint: u64,
}

impl EventSummary {
    /// Summarizes classified events; unclassified ones are ignored.
    pub fn of<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a LogEvent>,
    {
        let mut summary = Self::default();
        for event in events.into_iter().filter(|e| e.is_classified()) {
            *summary.counts.entry(event.kind).or_insert(0) += 1;
            // Summing per-event hashes keeps multiplicity and ignores order.
            summary.fingerprint = summary.fingerprint.wrapping_add(event_hash(event));
        }
        summary
    }

    /// Returns the number of events of `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Returns the total number of classified events.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

fn event_hash(event: &LogEvent) -> u64 {
    let mut input = String::with_capacity(event.identity().len() + 24);
    input.push_str(event.kind.name());
    input.push('\u{1f}');
    input.push_str(event.identity());
    xxh64(input.as_bytes(), 0)
}
