//! Verification report types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use vigil_events::PeerId;
use vigil_observe::Completion;

/// Outcome of one scenario's verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Scenario the report belongs to.
    pub scenario: String,
    /// Overall status.
    pub status: Status,
    /// Number of checks passed.
    pub checks_passed: usize,
    /// Total number of checks.
    pub checks_total: usize,
    /// Checks not evaluated because a precondition check failed.
    pub skipped: Vec<Check>,
    /// Every violation found, in check order.
    pub violations: Vec<Violation>,
    /// When the report was produced.
    pub checked_at: DateTime<Utc>,
}

/// Verification status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Every check passed.
    Passed,
    /// At least one check failed or was skipped.
    Failed,
}

/// A named invariant check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Every observation reached its target.
    Completeness,
    /// Every observation expected to hold events holds some.
    NonEmpty,
    /// Delivered-identifier sequences agree.
    TotalOrder,
    /// View-installation counts match the join schedule.
    ViewCount,
    /// Crash-detection counts match the crash schedule.
    CrashCount,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completeness => "completeness",
            Self::NonEmpty => "non-empty",
            Self::TotalOrder => "total-order",
            Self::ViewCount => "view-count",
            Self::CrashCount => "crash-count",
        };
        f.write_str(name)
    }
}

/// A failed check with enough context to diagnose without rerunning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Which check failed.
    pub check: Check,
    /// What disagreed.
    pub detail: Detail,
}

/// The values behind a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detail {
    /// The observation stopped short of its target.
    Incomplete {
        /// Rank of the peer.
        rank: usize,
        /// The peer.
        peer: PeerId,
        /// Target count.
        expected: usize,
        /// Events accepted.
        actual: usize,
        /// Why reading stopped.
        completion: Completion,
    },
    /// The observation accepted nothing.
    Empty {
        /// Rank of the peer.
        rank: usize,
        /// The peer.
        peer: PeerId,
    },
    /// Two peers disagree on delivery order.
    OrderMismatch {
        /// Rank of the first peer.
        left_rank: usize,
        /// First peer.
        left_peer: PeerId,
        /// Rank of the second peer.
        right_rank: usize,
        /// Second peer.
        right_peer: PeerId,
        /// First position where the sequences differ.
        position: usize,
        /// Value at `position` for the first peer, if any.
        left: Option<String>,
        /// Value at `position` for the second peer, if any.
        right: Option<String>,
    },
    /// A peer's count differs from the schedule's prediction.
    CountMismatch {
        /// Rank of the peer.
        rank: usize,
        /// The peer.
        peer: PeerId,
        /// Predicted count.
        expected: usize,
        /// Observed count.
        actual: usize,
    },
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub const fn new(check: Check, detail: Detail) -> Self {
        Self { check, detail }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.check)?;
        match &self.detail {
            Detail::Incomplete {
                rank,
                peer,
                expected,
                actual,
                completion,
            } => write!(
                f,
                "peer {rank} ({peer}) saw {actual} of {expected} expected events ({completion})"
            ),
            Detail::Empty { rank, peer } => {
                write!(f, "peer {rank} ({peer}) produced no events")
            }
            Detail::OrderMismatch {
                left_rank,
                left_peer,
                right_rank,
                right_peer,
                position,
                left,
                right,
            } => write!(
                f,
                "order of peer {left_rank} ({left_peer}) does not match peer {right_rank} ({right_peer}) at position {position}: {} vs {}",
                left.as_deref().unwrap_or("<missing>"),
                right.as_deref().unwrap_or("<missing>"),
            ),
            Detail::CountMismatch {
                rank,
                peer,
                expected,
                actual,
            } => write!(
                f,
                "peer {rank} ({peer}) expected {expected} but observed {actual}"
            ),
        }
    }
}

impl VerificationReport {
    /// Creates an empty, passing report.
    #[must_use]
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            status: Status::Passed,
            checks_passed: 0,
            checks_total: 0,
            skipped: Vec::new(),
            violations: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    /// Records the outcome of one check.
    pub fn record(&mut self, violations: Vec<Violation>) {
        self.checks_total += 1;
        if violations.is_empty() {
            self.checks_passed += 1;
        } else {
            self.status = Status::Failed;
            self.violations.extend(violations);
        }
    }

    /// Records a check that could not be evaluated.
    pub fn skip(&mut self, check: Check) {
        self.checks_total += 1;
        self.skipped.push(check);
        self.status = Status::Failed;
    }

    /// Folds another report's checks into this one.
    pub fn merge(&mut self, other: Self) {
        self.checks_total += other.checks_total;
        self.checks_passed += other.checks_passed;
        self.skipped.extend(other.skipped);
        self.violations.extend(other.violations);
        if other.status == Status::Failed {
            self.status = Status::Failed;
        }
    }

    /// Returns true if every check passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == Status::Passed
    }

    /// Returns the first violation, if any.
    #[must_use]
    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations.first()
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            Status::Passed => "PASSED",
            Status::Failed => "FAILED",
        };
        write!(
            f,
            "{}: {status} ({}/{} checks)",
            self.scenario, self.checks_passed, self.checks_total
        )?;
        for check in &self.skipped {
            write!(f, "\n  skipped [{check}]")?;
        }
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}
