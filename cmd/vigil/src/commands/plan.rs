//! Plan command implementation.

use anyhow::{Context, Result};
use vigil_scenario::{HarnessConfig, Scenario};

/// Runs the plan command.
pub fn run(config: &HarnessConfig, scenario: &str) -> Result<()> {
    let scenario: Scenario = scenario.parse()?;
    let hosts = config.resolve_hosts()?;
    let plan = scenario
        .plan(&hosts)
        .with_context(|| format!("Cannot plan {scenario}"))?;

    println!("{}", serde_json::to_string_pretty(&plan)?);
    let args = plan.launch_args();
    for host in &hosts {
        println!(
            "{} {}",
            config.docker.binary,
            config.docker.run_args(host, &args).join(" ")
        );
    }
    Ok(())
}
