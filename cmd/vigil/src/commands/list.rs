//! List command implementation.

use crate::FamilyArg;
use vigil_scenario::Scenario;

/// Runs the list command.
pub fn run(family: Option<FamilyArg>) {
    for line in lines(family) {
        println!("{line}");
    }
}

/// Returns true if `scenario` passes the family filter.
pub fn selected(scenario: Scenario, family: Option<FamilyArg>) -> bool {
    family.map_or(true, |family| scenario.family() == family.family())
}

fn lines(family: Option<FamilyArg>) -> Vec<String> {
    Scenario::ALL
        .into_iter()
        .filter(|scenario| selected(*scenario, family))
        .map(|scenario| {
            format!(
                "{:<18} {:<10} {:>2}+  {}",
                scenario.name(),
                scenario.family().to_string(),
                scenario.min_hosts(),
                scenario.description()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_membership_scenarios() {
        insta::assert_snapshot!(lines(Some(FamilyArg::Membership)).join("\n"), @r"
        join_views         membership  1+  sequential join, views [N..1] by rank
        single_crash       membership  2+  stop the last peer, survivors detect it once
        cascading_crashes  membership  2+  stop every follower last-first
        leader_failure     membership  2+  leader exits, every follower detects it
        ");
    }

    #[test]
    fn unfiltered_lists_everything() {
        assert_eq!(lines(None).len(), Scenario::ALL.len());
    }
}
