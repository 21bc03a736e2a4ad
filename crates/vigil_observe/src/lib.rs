//! Live observation of peer log feeds for Vigil.
//!
//! This crate provides:
//! - The transport seam ([`LogTransport`], [`LogSubscription`]) a process
//!   fleet implements to hand out live and historical logs
//! - [`EventFeed`]: a pull-based, classified view of one live subscription
//! - [`StopPredicate`]: counting policies deciding when a peer is done
//! - [`PeerStreamReader`]: drains one feed under a predicate and always
//!   closes its subscription before returning
//! - [`Collector`]: one reader per peer, joined through [`parallel_join`]
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_observe::{Collector, StopPredicate};
//! use vigil_events::EventKind;
//!
//! let collector = Collector::new(transport, classifier);
//! let collection = collector
//!     .collect(&peers, |_, _| StopPredicate::count(EventKind::MessageDelivered, 4), deadline)
//!     .await;
//! let results = collection.into_results()?;
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod collector;
pub mod error;
pub mod feed;
pub mod join;
pub mod observation;
pub mod predicate;
pub mod reader;
pub mod transport;

#[cfg(test)]
mod testing;

pub use collector::{Collection, Collector, PeerOutcome};
pub use error::{Error, Result};
pub use feed::EventFeed;
pub use join::parallel_join;
pub use observation::{Completion, ObservationResult};
pub use predicate::{Evaluator, Step, StopPredicate};
pub use reader::PeerStreamReader;
pub use transport::{LogSubscription, LogTransport};
