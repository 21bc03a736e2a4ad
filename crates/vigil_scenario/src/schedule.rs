//! Crash schedules.

use crate::error::ConfigError;
use serde::Serialize;

/// What the driver waits for after stopping a peer, before settling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// Only the settle delay.
    Settle,
    /// The leader (rank 0) has logged as many unreachable peers as have
    /// been stopped so far, then the settle delay.
    LeaderDetects,
}

/// One step of a crash schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CrashStep {
    /// Rank of the peer to stop.
    pub rank: usize,
    /// What to wait for afterwards.
    pub wait: WaitCondition,
}

/// Ordered peers to stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrashSchedule {
    /// Steps in execution order.
    pub steps: Vec<CrashStep>,
}

impl CrashSchedule {
    /// Stops `stops` peers from the tail of the join order, highest rank
    /// first, waiting for the leader after each.
    #[must_use]
    pub fn tail_first(peer_count: usize, stops: usize) -> Self {
        let stops = stops.min(peer_count.saturating_sub(1));
        Self {
            steps: (peer_count - stops..peer_count)
                .rev()
                .map(|rank| CrashStep {
                    rank,
                    wait: WaitCondition::LeaderDetects,
                })
                .collect(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, rank: usize, wait: WaitCondition) -> Self {
        self.steps.push(CrashStep { rank, wait });
        self
    }

    /// Ranks in the order they are stopped.
    pub fn ranks(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.rank).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing is stopped.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks the schedule against a topology of `peer_count` peers.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range rank, a rank stopped twice, or
    /// a step that waits on the leader once it has been stopped.
    pub fn validate(&self, peer_count: usize) -> Result<(), ConfigError> {
        let mut stopped = vec![false; peer_count];
        for step in &self.steps {
            if step.rank >= peer_count {
                return Err(ConfigError::CrashRank {
                    rank: step.rank,
                    peer_count,
                });
            }
            if stopped[step.rank] {
                return Err(ConfigError::RepeatedCrash(step.rank));
            }
            if (step.rank == 0 || stopped[0]) && step.wait == WaitCondition::LeaderDetects {
                return Err(ConfigError::LeaderWaitsOnItself);
            }
            stopped[step.rank] = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tail_first_stops_highest_rank_first() {
        let schedule = CrashSchedule::tail_first(4, 3);
        assert_eq!(schedule.ranks(), vec![3, 2, 1]);
        assert!(schedule
            .steps
            .iter()
            .all(|s| s.wait == WaitCondition::LeaderDetects));
        assert!(schedule.validate(4).is_ok());
    }

    #[test]
    fn tail_first_never_stops_the_leader() {
        assert_eq!(CrashSchedule::tail_first(3, 10).ranks(), vec![2, 1]);
        assert!(CrashSchedule::tail_first(1, 1).is_empty());
        assert!(CrashSchedule::tail_first(0, 1).is_empty());
    }

    #[test]
    fn validation_rejects_bad_steps() {
        let out_of_range = CrashSchedule::default().then(5, WaitCondition::Settle);
        assert!(matches!(
            out_of_range.validate(3),
            Err(ConfigError::CrashRank { rank: 5, .. })
        ));

        let twice = CrashSchedule::default()
            .then(2, WaitCondition::Settle)
            .then(2, WaitCondition::Settle);
        assert_eq!(twice.validate(3), Err(ConfigError::RepeatedCrash(2)));

        let leader = CrashSchedule::default().then(0, WaitCondition::LeaderDetects);
        assert_eq!(leader.validate(3), Err(ConfigError::LeaderWaitsOnItself));
        let leader = CrashSchedule::default().then(0, WaitCondition::Settle);
        assert!(leader.validate(3).is_ok());
        let after_leader = leader.then(2, WaitCondition::LeaderDetects);
        assert_eq!(after_leader.validate(3), Err(ConfigError::LeaderWaitsOnItself));
    }

    proptest! {
        #[test]
        fn tail_first_is_always_valid(peer_count in 0usize..16, stops in 0usize..20) {
            let schedule = CrashSchedule::tail_first(peer_count, stops);
            prop_assert!(schedule.validate(peer_count).is_ok());
            prop_assert!(!schedule.ranks().contains(&0));
            prop_assert_eq!(schedule.len(), stops.min(peer_count.saturating_sub(1)));
        }
    }
}
