//! Error types for classifier construction.

use thiserror::Error;

/// Errors that can occur while building a classifier.
///
/// Classifying a line never fails; only an ill-formed marker table does.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A marker has an empty needle and would match every line.
    #[error("marker for {kind} has an empty needle")]
    EmptyNeedle {
        /// Kind the marker was declared for.
        kind: String,
    },

    /// A marker targets the `unclassified` kind.
    #[error("marker '{needle}' cannot target the unclassified kind")]
    UnclassifiedTarget {
        /// The offending needle.
        needle: String,
    },

    /// The field delimiter is empty.
    #[error("field delimiter must not be empty")]
    EmptyDelimiter,
}

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, Error>;
