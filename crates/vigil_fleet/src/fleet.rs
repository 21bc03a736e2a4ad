//! The process fleet collaborator.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use vigil_events::PeerId;
use vigil_observe::LogTransport;

/// Peer name selector.
///
/// A trailing `*` selects every name with the given prefix; anything else
/// selects exactly one name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamePattern {
    /// Exactly this name.
    Exact(String),
    /// Every name starting with this prefix.
    Prefix(String),
}

impl NamePattern {
    /// Parses `host*` as a prefix and anything else as an exact name.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        pattern.strip_suffix('*').map_or_else(
            || Self::Exact(pattern.to_string()),
            |prefix| Self::Prefix(prefix.to_string()),
        )
    }

    /// Selects exactly `peer`.
    #[must_use]
    pub fn peer(peer: &PeerId) -> Self {
        Self::Exact(peer.as_str().to_string())
    }

    /// Returns true if `name` is selected.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => name == exact,
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }

    /// Returns the literal part of the pattern.
    #[must_use]
    pub fn stem(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Prefix(s) => s,
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

impl From<&str> for NamePattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}

/// Launches, stops and lists the peers under test and serves their logs.
///
/// Any command that exits non-zero is reported as
/// [`crate::Error::CommandFailed`].
#[async_trait]
pub trait ProcessFleet: LogTransport {
    /// One-time setup before any case runs (networks, directories).
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet cannot be prepared.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Starts `peer` with the given protocol arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the peer cannot be started.
    async fn launch(&self, peer: &PeerId, args: &[String]) -> Result<()>;

    /// Stops every peer matching `pattern`. Matching nothing is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a stop command fails.
    async fn stop(&self, pattern: &NamePattern) -> Result<()>;

    /// Removes every stopped peer matching `pattern`, discarding its log.
    ///
    /// # Errors
    ///
    /// Returns an error if a remove command fails.
    async fn remove(&self, pattern: &NamePattern) -> Result<()>;

    /// Lists the running peers matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    async fn running(&self, pattern: &NamePattern) -> Result<Vec<PeerId>>;

    /// Views this fleet as a bare log transport.
    fn log_transport(self: Arc<Self>) -> Arc<dyn LogTransport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_star_is_a_prefix() {
        let pattern = NamePattern::parse("host*");
        assert_eq!(pattern, NamePattern::Prefix("host".to_string()));
        assert!(pattern.matches("host1"));
        assert!(pattern.matches("host"));
        assert!(!pattern.matches("other"));
        assert_eq!(pattern.to_string(), "host*");
    }

    #[test]
    fn plain_name_is_exact() {
        let pattern = NamePattern::parse("host1");
        assert!(pattern.matches("host1"));
        assert!(!pattern.matches("host10"));
        assert_eq!(pattern.stem(), "host1");
    }
}
