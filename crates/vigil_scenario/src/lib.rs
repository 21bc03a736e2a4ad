//! Scenario driving for Vigil.
//!
//! A scenario launches peers of the system under test through a
//! [`vigil_fleet::ProcessFleet`], waits on their logs, induces crashes and
//! hands what it observed to the [`vigil_verifier::Verifier`]:
//!
//! - [`HarnessConfig`] is the YAML-backed environment (hosts, Docker,
//!   timing, markers)
//! - [`Scenario`] is the built-in catalogue; each one expands into a
//!   [`CasePlan`] for the configured hosts
//! - [`ScenarioDriver`] runs plans with teardown before and after each case
//! - [`SimulatedSut`] is an in-process stand-in for the protocol, used with
//!   [`vigil_fleet::MemoryFleet`]
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil_fleet::DockerFleet;
//! use vigil_scenario::{HarnessConfig, HarnessContext, Scenario, ScenarioDriver};
//!
//! let config = HarnessConfig::load("vigil.yaml".as_ref())?;
//! let fleet = Arc::new(DockerFleet::new(config.docker.clone()));
//! let driver = ScenarioDriver::new(HarnessContext::new(config, fleet)?);
//! driver.prepare().await?;
//! let report = driver.run(Scenario::SingleCrash).await?;
//! assert!(report.is_passed());
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod schedule;
pub mod sim;
pub mod suites;

pub use config::{parse_hostfile, read_hostfile, HarnessConfig, ScenarioConfig, TimingConfig};
pub use context::HarnessContext;
pub use driver::ScenarioDriver;
pub use error::{ConfigError, Error, Result};
pub use schedule::{CrashSchedule, CrashStep, WaitCondition};
pub use sim::{Fault, SimulatedSut};
pub use suites::{CasePlan, Family, Scenario};
