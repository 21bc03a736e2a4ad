//! Built-in scenario catalogue.
//!
//! Each scenario expands into a [`CasePlan`] once the hosts are known.

use crate::config::ScenarioConfig;
use crate::error::ConfigError;
use crate::schedule::CrashSchedule;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use vigil_events::PeerId;

/// Protocol layer a scenario exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Total-order multicast.
    Multicast,
    /// Group membership and failure detection.
    Membership,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Multicast => "multicast",
            Self::Membership => "membership",
        })
    }
}

/// A named test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// The first host multicasts two messages.
    SingleSender,
    /// The first two hosts multicast two messages each.
    TwoSenders,
    /// Every host multicasts two messages.
    AllSenders,
    /// One sender, half of all messages dropped.
    DropHalf,
    /// One sender, three quarters of all messages dropped.
    DropMajority,
    /// One sender, ten seconds of network delay.
    Delay,
    /// One sender, a quarter dropped and ten seconds of delay.
    DropDelay,
    /// Peers join one by one; view counts follow join rank.
    JoinViews,
    /// The last peer is stopped; every survivor detects it once.
    SingleCrash,
    /// Every peer but the leader is stopped, last first.
    CascadingCrashes,
    /// The leader exits on purpose; every follower detects it.
    LeaderFailure,
}

/// What a scenario runs and checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum CasePlan {
    /// Launch everyone with `config`, collect deliveries, check total order.
    TotalOrder {
        /// Protocol parameters.
        config: ScenarioConfig,
    },
    /// Join sequentially, then check view installation counts.
    JoinViews,
    /// Join sequentially, stop peers per `schedule`, check crash counts.
    Crashes {
        /// Peers to stop.
        schedule: CrashSchedule,
    },
    /// Join sequentially with the demo flag, then wait for the leader's
    /// exit signal and every follower's detection.
    LeaderFailure {
        /// Protocol parameters.
        config: ScenarioConfig,
    },
}

impl Scenario {
    /// Every scenario, multicast first.
    pub const ALL: [Self; 11] = [
        Self::SingleSender,
        Self::TwoSenders,
        Self::AllSenders,
        Self::DropHalf,
        Self::DropMajority,
        Self::Delay,
        Self::DropDelay,
        Self::JoinViews,
        Self::SingleCrash,
        Self::CascadingCrashes,
        Self::LeaderFailure,
    ];

    /// Returns the name of this scenario.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SingleSender => "single_sender",
            Self::TwoSenders => "two_senders",
            Self::AllSenders => "all_senders",
            Self::DropHalf => "drop_half",
            Self::DropMajority => "drop_majority",
            Self::Delay => "delay",
            Self::DropDelay => "drop_delay",
            Self::JoinViews => "join_views",
            Self::SingleCrash => "single_crash",
            Self::CascadingCrashes => "cascading_crashes",
            Self::LeaderFailure => "leader_failure",
        }
    }

    /// Returns the protocol layer this scenario exercises.
    #[must_use]
    pub const fn family(self) -> Family {
        match self {
            Self::SingleSender
            | Self::TwoSenders
            | Self::AllSenders
            | Self::DropHalf
            | Self::DropMajority
            | Self::Delay
            | Self::DropDelay => Family::Multicast,
            Self::JoinViews | Self::SingleCrash | Self::CascadingCrashes | Self::LeaderFailure => {
                Family::Membership
            }
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SingleSender => "first host multicasts 2 messages",
            Self::TwoSenders => "first two hosts multicast 2 messages each",
            Self::AllSenders => "every host multicasts 2 messages",
            Self::DropHalf => "one sender, drop rate 0.5",
            Self::DropMajority => "one sender, drop rate 0.75",
            Self::Delay => "one sender, 10000 ms delay",
            Self::DropDelay => "one sender, drop rate 0.25 and 10000 ms delay",
            Self::JoinViews => "sequential join, views [N..1] by rank",
            Self::SingleCrash => "stop the last peer, survivors detect it once",
            Self::CascadingCrashes => "stop every follower last-first",
            Self::LeaderFailure => "leader exits, every follower detects it",
        }
    }

    /// Minimum number of hosts the scenario needs.
    #[must_use]
    pub const fn min_hosts(self) -> usize {
        match self {
            Self::TwoSenders | Self::SingleCrash | Self::CascadingCrashes | Self::LeaderFailure => 2,
            _ => 1,
        }
    }

    /// Expands the scenario for `hosts`.
    ///
    /// # Errors
    ///
    /// Returns an error if there are too few hosts.
    pub fn plan(self, hosts: &[PeerId]) -> Result<CasePlan, ConfigError> {
        if hosts.len() < self.min_hosts() {
            return Err(ConfigError::TooFewHosts {
                scenario: self.name(),
                needed: self.min_hosts(),
                found: hosts.len(),
            });
        }
        let first = &hosts[..1];
        let plan = match self {
            Self::SingleSender => total_order(ScenarioConfig::multicast(first, 2)),
            Self::TwoSenders => total_order(ScenarioConfig::multicast(&hosts[..2], 2)),
            Self::AllSenders => total_order(ScenarioConfig::multicast(hosts, 2)),
            Self::DropHalf => total_order(ScenarioConfig::multicast(first, 2).with_drop_rate(0.5)),
            Self::DropMajority => {
                total_order(ScenarioConfig::multicast(first, 2).with_drop_rate(0.75))
            }
            Self::Delay => total_order(ScenarioConfig::multicast(first, 2).with_delay_ms(10_000)),
            Self::DropDelay => total_order(
                ScenarioConfig::multicast(first, 2)
                    .with_drop_rate(0.25)
                    .with_delay_ms(10_000),
            ),
            Self::JoinViews => CasePlan::JoinViews,
            Self::SingleCrash => CasePlan::Crashes {
                schedule: CrashSchedule::tail_first(hosts.len(), 1),
            },
            Self::CascadingCrashes => CasePlan::Crashes {
                schedule: CrashSchedule::tail_first(hosts.len(), hosts.len() - 1),
            },
            Self::LeaderFailure => CasePlan::LeaderFailure {
                config: ScenarioConfig::membership().with_leader_failure_demo(),
            },
        };
        Ok(plan)
    }
}

fn total_order(config: ScenarioConfig) -> CasePlan {
    CasePlan::TotalOrder { config }
}

impl CasePlan {
    /// Arguments every peer is launched with.
    pub fn launch_args(&self) -> Vec<String> {
        match self {
            Self::TotalOrder { config } | Self::LeaderFailure { config } => config.launch_args(),
            Self::JoinViews | Self::Crashes { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| ConfigError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(n: usize) -> Vec<PeerId> {
        (1..=n).map(|i| PeerId::new(format!("host{i}"))).collect()
    }

    #[test]
    fn names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        }
        assert_eq!(
            "nope".parse::<Scenario>(),
            Err(ConfigError::UnknownScenario("nope".into()))
        );
    }

    #[test]
    fn multicast_plans_pick_senders_from_the_front() {
        let hosts = hosts(4);
        let CasePlan::TotalOrder { config } = Scenario::TwoSenders.plan(&hosts).unwrap() else {
            panic!("expected a total-order plan");
        };
        assert_eq!(config.senders, hosts[..2].to_vec());
        assert_eq!(config.expected_deliveries(), 4);

        let CasePlan::TotalOrder { config } = Scenario::AllSenders.plan(&hosts).unwrap() else {
            panic!("expected a total-order plan");
        };
        assert_eq!(config.expected_deliveries(), 8);
    }

    #[test]
    fn drop_delay_parameters() {
        let CasePlan::TotalOrder { config } = Scenario::DropDelay.plan(&hosts(3)).unwrap() else {
            panic!("expected a total-order plan");
        };
        assert!((config.drop_rate - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.delay_ms, 10_000);
    }

    #[test]
    fn cascading_crashes_stop_every_follower() {
        let CasePlan::Crashes { schedule } = Scenario::CascadingCrashes.plan(&hosts(4)).unwrap()
        else {
            panic!("expected a crash plan");
        };
        assert_eq!(schedule.ranks(), vec![3, 2, 1]);
    }

    #[test]
    fn too_few_hosts_is_rejected() {
        assert!(matches!(
            Scenario::SingleCrash.plan(&hosts(1)),
            Err(ConfigError::TooFewHosts { needed: 2, found: 1, .. })
        ));
        assert!(Scenario::SingleSender.plan(&hosts(1)).is_ok());
    }

    #[test]
    fn membership_plans_launch_bare_peers() {
        let hosts = hosts(3);
        assert!(Scenario::JoinViews.plan(&hosts).unwrap().launch_args().is_empty());
        assert!(Scenario::SingleCrash.plan(&hosts).unwrap().launch_args().is_empty());
        assert_eq!(
            Scenario::LeaderFailure.plan(&hosts).unwrap().launch_args(),
            vec!["--leaderFailureDemo"]
        );
    }

    #[test]
    fn families_split_the_catalogue() {
        let membership = Scenario::ALL
            .iter()
            .filter(|s| s.family() == Family::Membership)
            .count();
        assert_eq!(membership, 4);
    }
}
