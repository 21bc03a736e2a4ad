//! Typed event model.
//!
//! A [`LogEvent`] is immutable once classified. It keeps the raw line so a
//! failed check can always be traced back to the exact text a peer wrote.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable name of one peer of the system under test (its hostname).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a peer identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PeerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Protocol-level fact recorded by a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The multicast layer delivered a message to the application.
    MessageDelivered,
    /// The membership service installed a new view.
    ViewInstalled,
    /// The leader finished sending a new view to every member.
    NewViewDelivered,
    /// The failure detector declared a peer unreachable.
    PeerUnreachable,
    /// The leader announced its own crash (leader-failure demo).
    LeaderCrashSignal,
    /// Nothing the harness cares about.
    Unclassified,
}

impl EventKind {
    /// All kinds a marker may target.
    pub const CLASSIFIED: [Self; 5] = [
        Self::MessageDelivered,
        Self::ViewInstalled,
        Self::NewViewDelivered,
        Self::PeerUnreachable,
        Self::LeaderCrashSignal,
    ];

    /// Returns the snake-case name used in configuration and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MessageDelivered => "message_delivered",
            Self::ViewInstalled => "view_installed",
            Self::NewViewDelivered => "new_view_delivered",
            Self::PeerUnreachable => "peer_unreachable",
            Self::LeaderCrashSignal => "leader_crash_signal",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One classified log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Peer whose feed produced the line.
    pub peer: PeerId,
    /// The line as received, without its trailing newline.
    pub raw: String,
    /// What the line records.
    pub kind: EventKind,
    /// Extracted field, e.g. the delivered message identity.
    pub field: Option<String>,
}

impl LogEvent {
    /// Creates an unclassified event.
    #[must_use]
    pub fn unclassified(peer: &PeerId, raw: impl Into<String>) -> Self {
        Self {
            peer: peer.clone(),
            raw: raw.into(),
            kind: EventKind::Unclassified,
            field: None,
        }
    }

    /// Returns true unless the line was unclassified.
    #[must_use]
    pub fn is_classified(&self) -> bool {
        self.kind != EventKind::Unclassified
    }

    /// Returns the value used to compare this event across peers.
    ///
    /// This is the extracted field when present, the raw line otherwise.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.raw)
    }
}
