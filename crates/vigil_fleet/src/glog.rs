//! glog-formatted log lines.
//!
//! Peers log through glog: `I1015 10:00:00.000001     7 file.cpp:88] msg`.
//! Everything up to the first `]` is prefix; classification works on what
//! follows.

use chrono::{DateTime, Utc};
use std::fmt;

/// glog severity letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// `I`
    Info,
    /// `W`
    Warning,
    /// `E`
    Error,
}

impl Severity {
    const fn letter(self) -> char {
        match self {
            Self::Info => 'I',
            Self::Warning => 'W',
            Self::Error => 'E',
        }
    }
}

/// One log line in glog layout.
#[derive(Debug, Clone)]
pub struct GlogLine<'a> {
    /// Line severity.
    pub severity: Severity,
    /// Timestamp.
    pub at: DateTime<Utc>,
    /// Thread id column.
    pub thread: u32,
    /// Source file column.
    pub file: &'a str,
    /// Source line column.
    pub line: u32,
    /// Message after the prefix.
    pub message: &'a str,
}

impl<'a> GlogLine<'a> {
    /// Creates an info line stamped now.
    #[must_use]
    pub fn info(file: &'a str, line: u32, message: &'a str) -> Self {
        Self {
            severity: Severity::Info,
            at: Utc::now(),
            thread: 1,
            file,
            line,
            message,
        }
    }

    /// Creates a warning line stamped now.
    #[must_use]
    pub fn warning(file: &'a str, line: u32, message: &'a str) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::info(file, line, message)
        }
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }

    /// Sets the thread column.
    #[must_use]
    pub const fn thread(mut self, thread: u32) -> Self {
        self.thread = thread;
        self
    }
}

impl fmt::Display for GlogLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {:>5} {}:{}] {}",
            self.severity.letter(),
            self.at.format("%m%d %H:%M:%S%.6f"),
            self.thread,
            self.file,
            self.line,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn renders_glog_prefix() {
        let at = Utc.with_ymd_and_hms(2020, 10, 15, 10, 0, 0).unwrap();
        let line = GlogLine::warning("failure_detector.cpp", 82, "Peer: 3 is not reachable")
            .at(at)
            .thread(7)
            .to_string();
        assert_eq!(
            line,
            "W1015 10:00:00.000000     7 failure_detector.cpp:82] Peer: 3 is not reachable"
        );
    }

    #[test]
    fn classifier_reads_the_message_segment() {
        let line = GlogLine::info("multicast.cpp", 430, "delivering dataMsg: 1").to_string();
        let event = vigil_events::Classifier::standard().classify(&"p".into(), &line);
        assert_eq!(event.field.as_deref(), Some("delivering dataMsg: 1"));
    }
}
