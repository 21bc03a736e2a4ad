//! Individual verification checks.

use crate::error::{Error, Result};
use crate::result::{Check, Detail, Violation};
use crate::verifier::ObservedCount;
use std::collections::BTreeMap;
use vigil_observe::ObservationResult;

/// Flags every observation that stopped short of its target.
pub fn check_completeness(results: &[ObservationResult]) -> Vec<Violation> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_complete())
        .map(|(rank, r)| {
            Violation::new(
                Check::Completeness,
                Detail::Incomplete {
                    rank,
                    peer: r.peer.clone(),
                    expected: r.target(),
                    actual: r.len(),
                    completion: r.completion,
                },
            )
        })
        .collect()
}

/// Flags every observation with a non-zero target that accepted nothing.
pub fn check_non_empty(results: &[ObservationResult]) -> Vec<Violation> {
    results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.target() > 0 && r.is_empty())
        .map(|(rank, r)| {
            Violation::new(
                Check::NonEmpty,
                Detail::Empty {
                    rank,
                    peer: r.peer.clone(),
                },
            )
        })
        .collect()
}

/// Compares delivery sequences of peers sharing the same expected count.
///
/// Each peer is compared with the next peer of its group in rank order,
/// which covers every pair by transitivity. Returns the mismatch with the
/// lowest left rank.
pub fn check_total_order(results: &[ObservationResult]) -> Option<Violation> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (rank, result) in results.iter().enumerate() {
        groups.entry(result.target()).or_default().push(rank);
    }

    groups
        .values()
        .flat_map(|ranks| ranks.windows(2))
        .filter_map(|pair| first_difference(results, pair[0], pair[1]))
        .min_by_key(|(left_rank, _)| *left_rank)
        .map(|(_, violation)| violation)
}

fn first_difference(
    results: &[ObservationResult],
    left: usize,
    right: usize,
) -> Option<(usize, Violation)> {
    let a = results[left].identities();
    let b = results[right].identities();
    let position = a
        .iter()
        .zip(&b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then_some(a.len().min(b.len())))?;

    let violation = Violation::new(
        Check::TotalOrder,
        Detail::OrderMismatch {
            left_rank: left,
            left_peer: results[left].peer.clone(),
            right_rank: right,
            right_peer: results[right].peer.clone(),
            position,
            left: a.get(position).map(|s| (*s).to_string()),
            right: b.get(position).map(|s| (*s).to_string()),
        },
    );
    Some((left, violation))
}

/// Compares observed counts with expected ones element-wise.
///
/// `expected[i] == None` excludes rank `i` from the comparison.
///
/// # Errors
///
/// Returns [`Error::LengthMismatch`] if the vectors are not aligned.
pub fn check_counts(
    check: Check,
    expected: &[Option<usize>],
    observed: &[ObservedCount],
) -> Result<Vec<Violation>> {
    if expected.len() != observed.len() {
        return Err(Error::LengthMismatch {
            expected: expected.len(),
            observed: observed.len(),
        });
    }

    Ok(expected
        .iter()
        .zip(observed)
        .filter_map(|(expected, observed)| {
            let expected = (*expected)?;
            (expected != observed.count).then(|| {
                Violation::new(
                    check,
                    Detail::CountMismatch {
                        rank: observed.rank,
                        peer: observed.peer.clone(),
                        expected,
                        actual: observed.count,
                    },
                )
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_events::{EventKind, LogEvent, PeerId};
    use vigil_observe::{Completion, StopPredicate};

    fn delivered(peer: &str, ids: &[&str], target: usize) -> ObservationResult {
        let peer = PeerId::new(peer);
        let events = ids
            .iter()
            .map(|id| LogEvent {
                peer: peer.clone(),
                raw: format!("x] {id}"),
                kind: EventKind::MessageDelivered,
                field: Some((*id).to_string()),
            })
            .collect::<Vec<_>>();
        let completion = if events.len() >= target {
            Completion::Satisfied
        } else {
            Completion::FeedEnded
        };
        ObservationResult::new(
            peer,
            StopPredicate::count(EventKind::MessageDelivered, target),
            events,
            completion,
            ids.len(),
        )
    }

    #[test]
    fn identical_orders_pass() {
        let results = vec![
            delivered("a", &["m1", "m2"], 2),
            delivered("b", &["m1", "m2"], 2),
            delivered("c", &["m1", "m2"], 2),
        ];
        assert!(check_total_order(&results).is_none());
    }

    #[test]
    fn first_mismatch_is_reported() {
        let results = vec![
            delivered("a", &["m1", "m2", "m3"], 3),
            delivered("b", &["m1", "m2", "m3"], 3),
            delivered("c", &["m1", "m3", "m2"], 3),
        ];
        let violation = check_total_order(&results).unwrap();
        match violation.detail {
            Detail::OrderMismatch {
                left_rank,
                right_rank,
                position,
                left,
                right,
                ..
            } => {
                assert_eq!((left_rank, right_rank, position), (1, 2, 1));
                assert_eq!(left.as_deref(), Some("m2"));
                assert_eq!(right.as_deref(), Some("m3"));
            }
            other => panic!("unexpected detail: {other:?}"),
        }
    }

    #[test]
    fn groups_with_different_targets_are_not_compared() {
        let results = vec![
            delivered("a", &["m1", "m2"], 2),
            delivered("b", &["x1"], 1),
            delivered("c", &["m1", "m2"], 2),
        ];
        assert!(check_total_order(&results).is_none());
    }

    #[test]
    fn length_difference_is_a_mismatch() {
        let results = vec![delivered("a", &["m1", "m2"], 2), delivered("b", &["m1"], 2)];
        let violation = check_total_order(&results).unwrap();
        assert!(matches!(
            violation.detail,
            Detail::OrderMismatch { position: 1, right: None, .. }
        ));
    }

    #[test]
    fn completeness_and_non_empty() {
        let results = vec![
            delivered("a", &["m1"], 2),
            delivered("b", &[], 2),
            delivered("c", &[], 0),
        ];
        let incomplete = check_completeness(&results);
        assert_eq!(incomplete.len(), 2);
        let empty = check_non_empty(&results);
        assert_eq!(empty.len(), 1);
        assert!(matches!(&empty[0].detail, Detail::Empty { rank: 1, .. }));
    }

    #[test]
    fn counts_skip_excluded_ranks() {
        let observed: Vec<ObservedCount> = [1, 0, 7]
            .iter()
            .enumerate()
            .map(|(rank, count)| ObservedCount::new(rank, PeerId::new(format!("p{rank}")), *count))
            .collect();
        let violations =
            check_counts(Check::CrashCount, &[Some(1), Some(1), None], &observed).unwrap();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0].detail,
            Detail::CountMismatch { rank: 1, expected: 1, actual: 0, .. }
        ));
    }

    #[test]
    fn misaligned_counts_are_an_error() {
        let err = check_counts(Check::ViewCount, &[Some(1)], &[]).unwrap_err();
        assert_eq!(err, Error::LengthMismatch { expected: 1, observed: 0 });
    }
}
