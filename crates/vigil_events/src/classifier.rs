//! Marker-based line classifier.
//!
//! Each [`Marker`] is a case-sensitive needle bound to one [`EventKind`].
//! Markers are tried in table order and the first hit wins. A marker that
//! extracts a field only looks at the segment after the first field
//! delimiter (the end of the glog prefix by default):
//!
//! ```text
//! I1015 10:00:00.000001     7 multicast.cpp:430] delivering dataMsg: sender: 1, msg_id: 3
//! \__________________ prefix _________________/ \_________________ segment ______________/
//! ```
//!
//! A line without the delimiter never matches a field-extracting marker.

use crate::error::{Error, Result};
use crate::model::{EventKind, LogEvent, PeerId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delimiter that closes the glog line prefix.
pub const DEFAULT_DELIMITER: &str = "]";

/// One needle bound to an event kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Kind produced when the needle matches.
    pub kind: EventKind,
    /// Case-sensitive substring to look for.
    pub needle: String,
    /// Whether to extract the segment after the delimiter as the event field.
    #[serde(default)]
    pub extract_field: bool,
}

impl Marker {
    /// Creates a marker that matches anywhere in the line.
    #[must_use]
    pub fn new(kind: EventKind, needle: impl Into<String>) -> Self {
        Self {
            kind,
            needle: needle.into(),
            extract_field: false,
        }
    }

    /// Creates a marker that extracts the post-delimiter segment as its field.
    #[must_use]
    pub fn with_field(kind: EventKind, needle: impl Into<String>) -> Self {
        Self {
            kind,
            needle: needle.into(),
            extract_field: true,
        }
    }
}

/// Ordered marker table plus the field delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerTable {
    /// Delimiter separating the line prefix from the message segment.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Markers in priority order.
    pub markers: Vec<Marker>,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl MarkerTable {
    /// Markers for the total-order multicast layer.
    #[must_use]
    pub fn multicast() -> Self {
        Self {
            delimiter: default_delimiter(),
            markers: vec![Marker::with_field(EventKind::MessageDelivered, "delivering")],
        }
    }

    /// Markers for the group membership service.
    #[must_use]
    pub fn membership() -> Self {
        Self {
            delimiter: default_delimiter(),
            markers: vec![
                Marker::new(EventKind::ViewInstalled, "new view installed"),
                Marker::new(EventKind::NewViewDelivered, "newViewMsg delivered to all peers"),
                Marker::new(EventKind::PeerUnreachable, "not reachable"),
                Marker::new(EventKind::LeaderCrashSignal, "leader failure demo: exiting"),
            ],
        }
    }

    /// Union of the multicast and membership tables.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::multicast();
        table.markers.extend(Self::membership().markers);
        table
    }

    /// Checks that the table can be used by a classifier.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty delimiter, an empty needle, or a marker
    /// targeting [`EventKind::Unclassified`].
    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::EmptyDelimiter);
        }
        for marker in &self.markers {
            if marker.kind == EventKind::Unclassified {
                return Err(Error::UnclassifiedTarget {
                    needle: marker.needle.clone(),
                });
            }
            if marker.needle.is_empty() {
                return Err(Error::EmptyNeedle {
                    kind: marker.kind.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Pure, total line classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    table: MarkerTable,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl Classifier {
    /// Creates a classifier from a validated marker table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table fails [`MarkerTable::validate`].
    pub fn new(table: MarkerTable) -> Result<Self> {
        table.validate()?;
        debug!(markers = table.markers.len(), delimiter = %table.delimiter, "marker table loaded");
        Ok(Self { table })
    }

    /// Classifier recognising every built-in marker.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            table: MarkerTable::standard(),
        }
    }

    /// Returns the marker table in use.
    #[must_use]
    pub const fn table(&self) -> &MarkerTable {
        &self.table
    }

    /// Classifies one raw line read from `peer`.
    ///
    /// Surrounding whitespace (including the newline) is stripped first.
    #[must_use]
    pub fn classify(&self, peer: &PeerId, line: &str) -> LogEvent {
        let line = line.trim();
        for marker in &self.table.markers {
            if marker.extract_field {
                let Some(segment) = self.segment(line) else {
                    continue;
                };
                if segment.contains(marker.needle.as_str()) {
                    return LogEvent {
                        peer: peer.clone(),
                        raw: line.to_string(),
                        kind: marker.kind,
                        field: Some(segment.trim().to_string()),
                    };
                }
            } else if line.contains(marker.needle.as_str()) {
                return LogEvent {
                    peer: peer.clone(),
                    raw: line.to_string(),
                    kind: marker.kind,
                    field: None,
                };
            }
        }
        LogEvent::unclassified(peer, line)
    }

    /// Classifies a batch of lines, dropping unclassified ones.
    pub fn classify_all<'a, I>(&self, peer: &PeerId, lines: I) -> Vec<LogEvent>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .map(|line| self.classify(peer, line))
            .filter(LogEvent::is_classified)
            .collect()
    }

    // Segment between the first and second delimiter, like `split(d)[1]`.
    fn segment<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.split(self.table.delimiter.as_str()).nth(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DELIVERY: &str = "I1015 10:00:00.000001     7 multicast.cpp:430] delivering dataMsg: type: 1, sender: 2, msg_id: 1, data: 7";

    fn peer() -> PeerId {
        PeerId::new("peer-0")
    }

    #[test]
    fn delivery_line_extracts_segment() {
        let event = Classifier::standard().classify(&peer(), DELIVERY);
        assert_eq!(event.kind, EventKind::MessageDelivered);
        assert_eq!(
            event.field.as_deref(),
            Some("delivering dataMsg: type: 1, sender: 2, msg_id: 1, data: 7")
        );
        assert_eq!(event.raw, DELIVERY);
    }

    #[test]
    fn missing_delimiter_is_unclassified() {
        let event = Classifier::standard().classify(&peer(), "delivering dataMsg: msg_id: 1");
        assert_eq!(event.kind, EventKind::Unclassified);
        assert!(event.field.is_none());
    }

    #[test]
    fn needle_in_prefix_does_not_count() {
        let event = Classifier::standard().classify(&peer(), "delivering.cpp:1] sending ack");
        assert_eq!(event.kind, EventKind::Unclassified);
    }

    #[test]
    fn membership_markers() {
        let classifier = Classifier::standard();
        let cases = [
            ("I1015 membership.cpp:229] new view installed, viewId: 2, members: {1, 2}", EventKind::ViewInstalled),
            ("W1015 failure_detector.cpp:82] Peer: 3 is not reachable", EventKind::PeerUnreachable),
            ("I1015 membership.cpp:204] newViewMsg delivered to all peers", EventKind::NewViewDelivered),
            ("I1015 membership.cpp:90] leader failure demo: exiting", EventKind::LeaderCrashSignal),
        ];
        for (line, kind) in cases {
            assert_eq!(classifier.classify(&peer(), line).kind, kind, "line: {line}");
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        let event = Classifier::standard().classify(&peer(), "x] New View Installed");
        assert_eq!(event.kind, EventKind::Unclassified);
    }

    #[test]
    fn first_marker_wins() {
        let table = MarkerTable {
            delimiter: "]".to_string(),
            markers: vec![
                Marker::new(EventKind::PeerUnreachable, "peer"),
                Marker::new(EventKind::ViewInstalled, "view"),
            ],
        };
        let classifier = Classifier::new(table).unwrap();
        let event = classifier.classify(&peer(), "peer view");
        assert_eq!(event.kind, EventKind::PeerUnreachable);
    }

    #[test]
    fn classify_all_drops_noise() {
        let lines = [DELIVERY, "I1015 x.cpp:1] waiting for message", DELIVERY];
        let events = Classifier::standard().classify_all(&peer(), lines);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn validate_rejects_bad_tables() {
        let mut table = MarkerTable::multicast();
        table.delimiter.clear();
        assert_eq!(Classifier::new(table).unwrap_err(), Error::EmptyDelimiter);

        let table = MarkerTable {
            delimiter: "]".to_string(),
            markers: vec![Marker::new(EventKind::ViewInstalled, "")],
        };
        assert!(matches!(Classifier::new(table), Err(Error::EmptyNeedle { .. })));

        let table = MarkerTable {
            delimiter: "]".to_string(),
            markers: vec![Marker::new(EventKind::Unclassified, "x")],
        };
        assert!(matches!(
            Classifier::new(table),
            Err(Error::UnclassifiedTarget { .. })
        ));
    }

    #[test]
    fn table_deserializes_with_default_delimiter() {
        let yaml = "markers:\n  - kind: peer_unreachable\n    needle: unreachable\n";
        let table: MarkerTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.delimiter, DEFAULT_DELIMITER);
        assert!(!table.markers[0].extract_field);
    }

    proptest! {
        #[test]
        fn classify_is_total_and_deterministic(line in ".*") {
            let classifier = Classifier::standard();
            let first = classifier.classify(&peer(), &line);
            let second = classifier.classify(&peer(), &line);
            prop_assert_eq!(&first, &second);
            if first.kind == EventKind::MessageDelivered {
                prop_assert!(line.contains(DEFAULT_DELIMITER));
                prop_assert!(first.field.is_some());
            }
        }
    }
}
