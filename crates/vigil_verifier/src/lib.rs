//! Cross-peer invariant verification for Vigil.
//!
//! The verifier only runs after every reader has been joined, on immutable
//! observation snapshots. Nothing here talks to a peer.
//!
//! # Checks Performed
//!
//! - **Completeness**: every observation reached its predicate's target
//! - **Non-empty**: every observation expected to hold events holds some
//! - **Total order**: peers expecting the same delivery count delivered the
//!   same identities in the same order
//! - **View count**: view installations follow join rank, `[N, N-1, ..., 1]`
//! - **Crash count**: each crash is detected once by every peer running at
//!   that moment
//!
//! Equality checks are skipped, not passed, when completeness or non-empty
//! fails: a short or empty observation says the harness did not see enough,
//! not that the protocol diverged.
//!
//! # Example
//!
//! ```rust,ignore
//! use vigil_verifier::Verifier;
//!
//! let report = Verifier::total_order("single_sender", &results);
//! assert!(report.is_passed(), "{report}");
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod checks;
pub mod error;
pub mod expectations;
pub mod result;
pub mod verifier;

pub use error::{Error, Result};
pub use expectations::{expected_unreachable_counts, expected_view_installations};
pub use result::{Check, Detail, Status, VerificationReport, Violation};
pub use verifier::{ObservedCount, Verifier};
