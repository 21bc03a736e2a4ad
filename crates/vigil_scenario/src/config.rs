//! Harness and scenario configuration.
//!
//! [`HarnessConfig`] is read once from YAML and describes the environment:
//! hosts, the Docker fleet, timing and classifier markers. Every field has
//! a default, so an empty file is a valid configuration.
//! [`ScenarioConfig`] describes one test case and is validated against the
//! hosts before anything is launched.

use crate::error::{ConfigError, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vigil_events::{Classifier, MarkerTable, PeerId};
use vigil_fleet::{DockerConfig, NamePattern};

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Hosts in join order. Ignored when `hostfile` is set.
    pub hosts: Vec<String>,
    /// File with one hostname per line.
    pub hostfile: Option<PathBuf>,
    /// Pattern matching every peer, used for teardown (e.g. `host*`).
    /// Without one, each host is torn down by name.
    pub peer_pattern: Option<String>,
    /// Docker fleet settings.
    pub docker: DockerConfig,
    /// Timeouts and delays.
    pub timing: TimingConfig,
    /// Classifier marker table; the standard table when unset.
    pub markers: Option<MarkerTable>,
    /// Seed for the simulated peers.
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            hostfile: None,
            peer_pattern: None,
            docker: DockerConfig::default(),
            timing: TimingConfig::default(),
            markers: None,
            seed: 42,
        }
    }
}

/// Timeouts and delays, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper bound on all observation within one case.
    pub scenario_timeout_ms: u64,
    /// Wait after each induced crash so every survivor can detect it.
    pub settle_delay_ms: u64,
    /// Interval between "is the peer running yet" polls.
    pub startup_poll_interval_ms: u64,
    /// Polls before a launched peer counts as failed.
    pub startup_poll_attempts: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scenario_timeout_ms: 120_000,
            settle_delay_ms: 1_500,
            startup_poll_interval_ms: 250,
            startup_poll_attempts: 40,
        }
    }
}

impl TimingConfig {
    /// Per-case observation budget.
    #[must_use]
    pub const fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }

    /// Post-crash settle delay.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Startup poll interval.
    #[must_use]
    pub const fn startup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.startup_poll_interval_ms)
    }
}

impl HarnessConfig {
    /// Loads a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parses a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Resolves the host list, reading the hostfile if one is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostfile cannot be read, no hosts remain, or
    /// a host is listed twice.
    pub fn resolve_hosts(&self) -> Result<Vec<PeerId>> {
        let hosts = match &self.hostfile {
            Some(path) => read_hostfile(path)?,
            None => self.hosts.clone(),
        };
        if hosts.is_empty() {
            return Err(ConfigError::NoHosts.into());
        }
        let mut seen = HashSet::new();
        for host in &hosts {
            if !seen.insert(host.as_str()) {
                return Err(ConfigError::DuplicateHost(host.clone()).into());
            }
        }
        Ok(hosts.into_iter().map(PeerId::from).collect())
    }

    /// Builds the classifier from the configured markers.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker table is invalid.
    pub fn classifier(&self) -> Result<Classifier> {
        match &self.markers {
            Some(table) => Ok(Classifier::new(table.clone())?),
            None => Ok(Classifier::standard()),
        }
    }

    /// Patterns that together select every peer of `hosts`.
    #[must_use]
    pub fn teardown_patterns(&self, hosts: &[PeerId]) -> Vec<NamePattern> {
        self.peer_pattern.as_deref().map_or_else(
            || hosts.iter().map(NamePattern::peer).collect(),
            |pattern| vec![NamePattern::parse(pattern)],
        )
    }
}

/// Parses hostfile contents: one hostname per line, blank lines ignored.
#[must_use]
pub fn parse_hostfile(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Reads and parses a hostfile.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_hostfile(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_hostfile(&text))
}

/// Protocol parameters for one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ScenarioConfig {
    /// Peers that multicast.
    pub senders: Vec<PeerId>,
    /// Messages each sender multicasts.
    pub message_count: u32,
    /// Fraction of messages the peers drop, in `[0, 1]`.
    pub drop_rate: f64,
    /// Artificial network delay in milliseconds.
    pub delay_ms: u64,
    /// Deliveries after which a snapshot starts.
    pub snapshot_initiation_count: u32,
    /// Whether the leader exits on purpose after the group forms.
    pub leader_failure_demo: bool,
}

impl ScenarioConfig {
    /// Multicast case: each of `senders` sends `message_count` messages.
    #[must_use]
    pub fn multicast(senders: &[PeerId], message_count: u32) -> Self {
        Self {
            senders: senders.to_vec(),
            message_count,
            ..Self::default()
        }
    }

    /// Membership case with no protocol parameters.
    #[must_use]
    pub fn membership() -> Self {
        Self::default()
    }

    /// Sets the drop rate.
    #[must_use]
    pub fn with_drop_rate(mut self, drop_rate: f64) -> Self {
        self.drop_rate = drop_rate;
        self
    }

    /// Sets the network delay.
    #[must_use]
    pub const fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Sets the snapshot-initiation count.
    #[must_use]
    pub const fn with_snapshot_after(mut self, count: u32) -> Self {
        self.snapshot_initiation_count = count;
        self
    }

    /// Enables the leader-failure demo.
    #[must_use]
    pub const fn with_leader_failure_demo(mut self) -> Self {
        self.leader_failure_demo = true;
        self
    }

    /// Deliveries each peer must make: senders times messages per sender.
    #[must_use]
    pub fn expected_deliveries(&self) -> usize {
        self.senders.len() * self.message_count as usize
    }

    /// Checks the parameters against the configured hosts.
    ///
    /// # Errors
    ///
    /// Returns an error for a drop rate outside `[0, 1]` or a sender that is
    /// not a host.
    pub fn validate(&self, hosts: &[PeerId]) -> std::result::Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(ConfigError::DropRate(self.drop_rate));
        }
        if let Some(sender) = self.senders.iter().find(|s| !hosts.contains(s)) {
            return Err(ConfigError::UnknownSender(sender.to_string()));
        }
        Ok(())
    }

    /// Command-line arguments passed to every peer.
    ///
    /// Multicast parameters are only passed when there are senders.
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.senders.is_empty() {
            let senders: Vec<&str> = self.senders.iter().map(PeerId::as_str).collect();
            args.extend([
                "--senders".to_string(),
                senders.join(","),
                "--msgCount".to_string(),
                self.message_count.to_string(),
                "--dropRate".to_string(),
                self.drop_rate.to_string(),
                "--delay".to_string(),
                self.delay_ms.to_string(),
                "--initiateSnapshotCount".to_string(),
                self.snapshot_initiation_count.to_string(),
            ]);
        }
        if self.leader_failure_demo {
            args.push("--leaderFailureDemo".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(names: &[&str]) -> Vec<PeerId> {
        names.iter().map(|n| PeerId::new(*n)).collect()
    }

    #[test]
    fn empty_yaml_is_default() {
        let config = HarnessConfig::from_yaml("").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.timing.settle_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = HarnessConfig::from_yaml(
            "hosts: [host1, host2]\ntiming:\n  settle_delay_ms: 3000\ndocker:\n  image: lab-peer\n",
        )
        .unwrap();
        assert_eq!(config.timing.settle_delay_ms, 3000);
        assert_eq!(config.timing.scenario_timeout_ms, 120_000);
        assert_eq!(config.docker.image, "lab-peer");
        assert_eq!(config.docker.network, "vigil-bridge");
        assert_eq!(config.resolve_hosts().unwrap(), hosts(&["host1", "host2"]));
    }

    #[test]
    fn marker_override_builds_classifier() {
        let config = HarnessConfig::from_yaml(
            "markers:\n  markers:\n    - kind: view_installed\n      needle: VIEW\n",
        )
        .unwrap();
        let classifier = config.classifier().unwrap();
        let event = classifier.classify(&"p".into(), "I] VIEW 3");
        assert_eq!(event.kind, vigil_events::EventKind::ViewInstalled);
    }

    #[test]
    fn hostfile_skips_blank_lines() {
        assert_eq!(parse_hostfile("host1\n\n  host2 \n"), vec!["host1", "host2"]);
    }

    #[test]
    fn missing_hostfile_is_a_read_error() {
        let config = HarnessConfig {
            hostfile: Some(PathBuf::from("/nonexistent/vigil/hostfile")),
            ..HarnessConfig::default()
        };
        assert!(matches!(config.resolve_hosts(), Err(Error::Read { .. })));
    }

    #[test]
    fn hosts_must_be_unique_and_present() {
        let empty = HarnessConfig::default();
        assert!(matches!(
            empty.resolve_hosts(),
            Err(Error::Config(ConfigError::NoHosts))
        ));
        let duplicate = HarnessConfig {
            hosts: vec!["a".into(), "a".into()],
            ..HarnessConfig::default()
        };
        assert!(matches!(
            duplicate.resolve_hosts(),
            Err(Error::Config(ConfigError::DuplicateHost(_)))
        ));
    }

    #[test]
    fn teardown_uses_pattern_when_set() {
        let mut config = HarnessConfig::default();
        let peers = hosts(&["a", "b"]);
        assert_eq!(config.teardown_patterns(&peers).len(), 2);
        config.peer_pattern = Some("host*".into());
        assert_eq!(
            config.teardown_patterns(&peers),
            vec![NamePattern::Prefix("host".into())]
        );
    }

    #[test]
    fn drop_rate_must_be_a_fraction() {
        let peers = hosts(&["a"]);
        let config = ScenarioConfig::multicast(&peers, 2);
        assert!(config.clone().with_drop_rate(1.0).validate(&peers).is_ok());
        assert_eq!(
            config.clone().with_drop_rate(1.5).validate(&peers),
            Err(ConfigError::DropRate(1.5))
        );
        assert!(config.with_drop_rate(f64::NAN).validate(&peers).is_err());
    }

    #[test]
    fn senders_must_be_hosts() {
        let config = ScenarioConfig::multicast(&hosts(&["z"]), 1);
        assert_eq!(
            config.validate(&hosts(&["a", "b"])),
            Err(ConfigError::UnknownSender("z".into()))
        );
    }

    #[test]
    fn multicast_launch_args() {
        let config = ScenarioConfig::multicast(&hosts(&["host1", "host2"]), 2)
            .with_drop_rate(0.25)
            .with_delay_ms(10_000);
        insta::assert_snapshot!(
            config.launch_args().join(" "),
            @"--senders host1,host2 --msgCount 2 --dropRate 0.25 --delay 10000 --initiateSnapshotCount 0"
        );
        assert_eq!(config.expected_deliveries(), 4);
    }

    #[test]
    fn snapshot_count_reaches_the_peers() {
        let args = ScenarioConfig::multicast(&hosts(&["host1"]), 5)
            .with_snapshot_after(3)
            .launch_args();
        let at = args
            .iter()
            .position(|a| a == "--initiateSnapshotCount")
            .unwrap();
        assert_eq!(args[at + 1], "3");
    }

    #[test]
    fn membership_launch_args() {
        assert!(ScenarioConfig::membership().launch_args().is_empty());
        assert_eq!(
            ScenarioConfig::membership()
                .with_leader_failure_demo()
                .launch_args(),
            vec!["--leaderFailureDemo"]
        );
    }
}
