//! Classify command implementation.
//!
//! Classifies a saved peer log offline, e.g. a glog file copied out of a
//! container after a failed run.

use crate::FamilyArg;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use vigil_events::{Classifier, EventSummary, MarkerTable, PeerId};
use vigil_scenario::HarnessConfig;

/// Runs the classify command.
pub fn run(
    config: &HarnessConfig,
    path: &Path,
    family: Option<FamilyArg>,
    events: bool,
    json: bool,
) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file: {}", path.display()))?;
    let classifier = match family {
        Some(FamilyArg::Multicast) => Classifier::new(MarkerTable::multicast())?,
        Some(FamilyArg::Membership) => Classifier::new(MarkerTable::membership())?,
        None => config.classifier()?,
    };
    let peer = PeerId::new(
        path.file_stem()
            .map_or_else(|| "log".into(), |stem| stem.to_string_lossy().into_owned()),
    );

    let classified = classifier.classify_all(&peer, text.lines());
    info!(%peer, lines = text.lines().count(), events = classified.len(), "classified log");
    if events {
        for event in &classified {
            println!("{:<20} {}", event.kind.to_string(), event.identity());
        }
    }

    let summary = EventSummary::of(&classified);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render(&summary));
    }
    Ok(())
}

fn render(summary: &EventSummary) -> String {
    let mut out = String::new();
    for (kind, count) in &summary.counts {
        out.push_str(&format!("{kind}: {count}\n"));
    }
    out.push_str(&format!("fingerprint: {:016x}\n", summary.fingerprint));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
I1015 10:00:00.000001     1 membership.cpp:229] new view installed, viewId: 1, members: {1}
I1015 10:00:01.000001     1 membership.cpp:229] new view installed, viewId: 2, members: {1, 2}
W1015 10:00:02.000001     1 failure_detector.cpp:82] Peer: 2 is not reachable
I1015 10:00:02.500000     1 main.cpp:12] heartbeat
";

    #[test]
    fn counts_by_kind() {
        let peer = PeerId::new("host1");
        let events = Classifier::standard().classify_all(&peer, LOG.lines());
        let summary = EventSummary::of(&events);
        let rendered = render(&summary);
        let counts: Vec<&str> = rendered.lines().take(2).collect();
        assert_eq!(counts, vec!["view_installed: 2", "peer_unreachable: 1"]);
        assert!(rendered.contains("fingerprint: "));
    }
}
