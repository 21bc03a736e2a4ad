//! Run command implementation.

use super::list::selected;
use crate::FamilyArg;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use vigil_fleet::{DockerFleet, MemoryFleet, ProcessFleet};
use vigil_scenario::{HarnessConfig, HarnessContext, Scenario, ScenarioDriver, SimulatedSut};
use vigil_verifier::{Status, VerificationReport};

/// Resolves the scenarios to run from names or `--all`.
pub fn select(names: &[String], all: bool, family: Option<FamilyArg>) -> Result<Vec<Scenario>> {
    if all {
        return Ok(Scenario::ALL
            .into_iter()
            .filter(|scenario| selected(*scenario, family))
            .collect());
    }
    if names.is_empty() {
        bail!("No scenarios given; name some or pass --all (see `vigil list`)");
    }
    names
        .iter()
        .map(|name| name.parse::<Scenario>().map_err(Into::into))
        .collect()
}

/// Runs the run command.
pub async fn run(
    config: HarnessConfig,
    scenarios: &[Scenario],
    simulate: bool,
    json: bool,
) -> Result<()> {
    let fleet: Arc<dyn ProcessFleet> = if simulate {
        let hosts = config.resolve_hosts()?;
        info!(hosts = hosts.len(), seed = config.seed, "using simulated peers");
        Arc::new(MemoryFleet::new(Arc::new(SimulatedSut::new(
            hosts,
            config.seed,
        ))))
    } else {
        Arc::new(DockerFleet::new(config.docker.clone()))
    };
    let driver = ScenarioDriver::new(HarnessContext::new(config, fleet)?);
    driver
        .prepare()
        .await
        .context("Failed to prepare the fleet")?;

    let mut reports = Vec::with_capacity(scenarios.len());
    for &scenario in scenarios {
        let report = driver
            .run(scenario)
            .await
            .with_context(|| format!("Scenario {scenario} aborted"))?;
        if json {
            println!("{}", report.to_json()?);
        } else {
            println!("{report}");
        }
        for violation in &report.violations {
            error!(%scenario, "{violation}");
        }
        reports.push(report);
    }

    let failures = failed(&reports);
    if !failures.is_empty() {
        bail!(
            "{} of {} scenario(s) failed: {}",
            failures.len(),
            scenarios.len(),
            failures.join(", ")
        );
    }
    info!("All {} scenario(s) passed", scenarios.len());
    Ok(())
}

/// Names of the scenarios whose report did not pass, in run order.
fn failed(reports: &[VerificationReport]) -> Vec<&str> {
    reports
        .iter()
        .filter(|report| report.status == Status::Failed)
        .map(|report| report.scenario.as_str())
        .collect()
}
