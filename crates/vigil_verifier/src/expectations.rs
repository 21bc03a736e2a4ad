//! Expected per-peer counts derived from topology and crash schedule.
//!
//! Peers are identified by rank: their index in the join order.

use crate::error::{Error, Result};

/// Expected view installations per rank when peers join one at a time and
/// nothing crashes.
///
/// The peer at rank `i` is present for its own join and every later one,
/// so it installs `peer_count - i` views.
#[must_use]
pub fn expected_view_installations(peer_count: usize) -> Vec<usize> {
    (0..peer_count).map(|rank| peer_count - rank).collect()
}

/// Expected "peer unreachable" counts per rank for crashes applied in
/// `crash_order`.
///
/// Each crash is detected exactly once by every peer still running when it
/// happens, other than the crashed peer. A peer that crashed without
/// detecting anything is excluded (`None`): its log says nothing the
/// schedule can predict. Crashing an already crashed rank is a no-op.
///
/// For tail-first schedules this reduces to "after stopping rank k, every
/// rank below k reports one more unreachable peer and no rank at or above
/// k does".
///
/// # Errors
///
/// Returns [`Error::RankOutOfRange`] if `crash_order` names a rank outside
/// `0..peer_count`.
pub fn expected_unreachable_counts(
    peer_count: usize,
    crash_order: &[usize],
) -> Result<Vec<Option<usize>>> {
    let mut alive = vec![true; peer_count];
    let mut counts = vec![0usize; peer_count];

    for &crashed in crash_order {
        if crashed >= peer_count {
            return Err(Error::RankOutOfRange {
                rank: crashed,
                peer_count,
            });
        }
        if !alive[crashed] {
            continue;
        }
        alive[crashed] = false;
        for (observer, count) in counts.iter_mut().enumerate() {
            if alive[observer] {
                *count += 1;
            }
        }
    }

    Ok(counts
        .into_iter()
        .zip(alive)
        .map(|(count, alive)| (alive || count > 0).then_some(count))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn views_descend_by_rank() {
        assert_eq!(expected_view_installations(3), vec![3, 2, 1]);
        assert!(expected_view_installations(0).is_empty());
    }

    #[test]
    fn single_tail_crash() {
        // Three peers, stop the last one.
        assert_eq!(
            expected_unreachable_counts(3, &[2]).unwrap(),
            vec![Some(1), Some(1), None]
        );
    }

    #[test]
    fn cascading_tail_crashes() {
        // Stop ranks 3, 2, 1 in turn: each survivor sees every later crash.
        assert_eq!(
            expected_unreachable_counts(4, &[3, 2, 1]).unwrap(),
            vec![Some(3), Some(2), Some(1), None]
        );
    }

    #[test]
    fn leader_crash_is_seen_by_all_followers() {
        assert_eq!(
            expected_unreachable_counts(3, &[0]).unwrap(),
            vec![None, Some(1), Some(1)]
        );
    }

    #[test]
    fn repeated_crash_is_ignored() {
        assert_eq!(
            expected_unreachable_counts(2, &[1, 1]).unwrap(),
            vec![Some(1), None]
        );
    }

    #[test]
    fn out_of_range_rank_is_rejected() {
        assert_eq!(
            expected_unreachable_counts(2, &[2]).unwrap_err(),
            Error::RankOutOfRange {
                rank: 2,
                peer_count: 2
            }
        );
    }

    proptest! {
        #[test]
        fn tail_first_schedule_matches_rank_rule(peer_count in 1usize..12, stops in 0usize..12) {
            let stops = stops.min(peer_count - 1);
            let order: Vec<usize> = (peer_count - stops..peer_count).rev().collect();
            let counts = expected_unreachable_counts(peer_count, &order).unwrap();
            for (rank, count) in counts.iter().enumerate() {
                let later_crashes = order.iter().filter(|&&c| c > rank).count();
                if order.contains(&rank) && later_crashes == 0 {
                    prop_assert_eq!(*count, None);
                } else {
                    prop_assert_eq!(*count, Some(later_crashes));
                }
            }
        }
    }
}
