//! Process fleets hosting the peers under test.
//!
//! A fleet launches, stops, removes and lists peers, and serves their logs
//! through the [`vigil_observe::LogTransport`] seam. Two fleets ship here:
//!
//! - [`DockerFleet`]: one container per peer, driven through the `docker`
//!   CLI. Live logs follow `docker logs -f` with stdout and stderr merged.
//! - [`MemoryFleet`]: peers are log buffers in memory. A [`PeerBehaviour`]
//!   hook writes whatever the simulated peers would log. Subscriptions are
//!   counted so tests can assert every one was released.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_fleet::{DockerConfig, DockerFleet, NamePattern, ProcessFleet};
//!
//! let fleet = DockerFleet::new(DockerConfig::default());
//! fleet.prepare().await?;
//! fleet.launch(&"host1".into(), &[]).await?;
//! let running = fleet.running(&NamePattern::parse("host*")).await?;
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod docker;
pub mod error;
pub mod fleet;
pub mod glog;
pub mod memory;

pub use docker::{DockerConfig, DockerFleet, LogMount};
pub use error::{Error, Result};
pub use fleet::{NamePattern, ProcessFleet};
pub use glog::{GlogLine, Severity};
pub use memory::{LogBook, MemoryFleet, PeerBehaviour, Silent, SubscriptionStats};
