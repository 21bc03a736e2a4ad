//! Log line classification for Vigil.
//!
//! Peers of the system under test only speak through their logs. This crate
//! turns one raw log line into at most one typed [`LogEvent`]:
//! - [`EventKind`] names the protocol-level fact a line records
//! - [`Classifier`] applies a case-sensitive marker table line by line
//! - [`EventSummary`] counts and fingerprints classified event sets
//!
//! Classification is total and pure: a line that matches nothing, or whose
//! field delimiter is missing, comes back as [`EventKind::Unclassified`].
//!
//! # Example
//!
//! ```rust
//! use vigil_events::{Classifier, EventKind, PeerId};
//!
//! let classifier = Classifier::standard();
//! let peer = PeerId::new("peer-0");
//! let event = classifier.classify(&peer, "I1015 10:00:00.000001 7 multicast.cpp:430] delivering dataMsg: msg_id: 1");
//! assert_eq!(event.kind, EventKind::MessageDelivered);
//! assert_eq!(event.field.as_deref(), Some("delivering dataMsg: msg_id: 1"));
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod classifier;
pub mod error;
pub mod model;
pub mod summary;

pub use classifier::{Classifier, Marker, MarkerTable, DEFAULT_DELIMITER};
pub use error::{Error, Result};
pub use model::{EventKind, LogEvent, PeerId};
pub use summary::EventSummary;
