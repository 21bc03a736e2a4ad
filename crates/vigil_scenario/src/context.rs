//! Explicit harness context.

use crate::config::HarnessConfig;
use crate::error::Result;
use std::sync::Arc;
use vigil_events::{Classifier, PeerId};
use vigil_fleet::ProcessFleet;
use vigil_observe::Collector;

/// Everything a scenario run needs, passed explicitly.
#[derive(Clone)]
pub struct HarnessContext {
    config: HarnessConfig,
    hosts: Vec<PeerId>,
    fleet: Arc<dyn ProcessFleet>,
    classifier: Arc<Classifier>,
}

impl std::fmt::Debug for HarnessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessContext")
            .field("hosts", &self.hosts)
            .field("timing", &self.config.timing)
            .finish_non_exhaustive()
    }
}

impl HarnessContext {
    /// Resolves hosts and the classifier from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hosts or the marker table are invalid.
    pub fn new(config: HarnessConfig, fleet: Arc<dyn ProcessFleet>) -> Result<Self> {
        let hosts = config.resolve_hosts()?;
        let classifier = Arc::new(config.classifier()?);
        Ok(Self {
            config,
            hosts,
            fleet,
            classifier,
        })
    }

    /// Harness configuration.
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Hosts in join order.
    pub fn hosts(&self) -> &[PeerId] {
        &self.hosts
    }

    /// The process fleet.
    pub fn fleet(&self) -> &dyn ProcessFleet {
        self.fleet.as_ref()
    }

    /// The shared classifier.
    pub const fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// A collector over the fleet's logs.
    pub fn collector(&self) -> Collector {
        Collector::new(
            Arc::clone(&self.fleet).log_transport(),
            Arc::clone(&self.classifier),
        )
    }
}
