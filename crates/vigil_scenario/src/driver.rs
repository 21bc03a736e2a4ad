//! Scenario driver.
//!
//! Runs one test case end to end: tear down leftovers, launch peers, wait
//! on their logs, induce crashes, verify, tear down again. Teardown runs
//! after every case, including failed ones. Fleet failures abort the case;
//! protocol misbehaviour ends up in the report instead.

use crate::config::ScenarioConfig;
use crate::context::HarnessContext;
use crate::error::{Error, Result};
use crate::schedule::{CrashSchedule, WaitCondition};
use crate::suites::{CasePlan, Scenario};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use vigil_events::{EventKind, EventSummary, PeerId};
use vigil_fleet::NamePattern;
use vigil_observe::{ObservationResult, StopPredicate};
use vigil_verifier::{expected_unreachable_counts, ObservedCount, VerificationReport, Verifier};

/// Drives scenarios against a fleet.
#[derive(Debug, Clone)]
pub struct ScenarioDriver {
    ctx: HarnessContext,
}

impl ScenarioDriver {
    /// Creates a driver over `ctx`.
    pub const fn new(ctx: HarnessContext) -> Self {
        Self { ctx }
    }

    /// Returns the harness context.
    pub const fn context(&self) -> &HarnessContext {
        &self.ctx
    }

    /// One-time fleet setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet cannot be prepared.
    pub async fn prepare(&self) -> Result<()> {
        Ok(self.ctx.fleet().prepare().await?)
    }

    /// Runs a catalogue scenario.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario cannot be planned for the hosts or
    /// the run hits a precondition or transport failure.
    pub async fn run(&self, scenario: Scenario) -> Result<VerificationReport> {
        let plan = scenario.plan(self.ctx.hosts())?;
        info!(%scenario, family = %scenario.family(), "starting scenario");
        self.run_plan(scenario.name(), &plan).await
    }

    /// Runs an explicit plan under `name`, with teardown before and after.
    ///
    /// # Errors
    ///
    /// Returns an error on precondition or transport failure. A failed
    /// teardown after an otherwise successful case is an error too.
    pub async fn run_plan(&self, name: &str, plan: &CasePlan) -> Result<VerificationReport> {
        self.reset().await?;
        let outcome = self.execute(name, plan).await;
        let teardown = self.reset().await;
        match (outcome, teardown) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), teardown) => {
                if let Err(teardown) = teardown {
                    warn!(scenario = name, error = %teardown, "teardown after failed case failed");
                }
                Err(e)
            }
        }
    }

    /// Stops and removes every peer.
    ///
    /// # Errors
    ///
    /// Returns an error if a stop or remove command fails.
    pub async fn reset(&self) -> Result<()> {
        let fleet = self.ctx.fleet();
        for pattern in self.ctx.config().teardown_patterns(self.ctx.hosts()) {
            fleet.stop(&pattern).await?;
            fleet.remove(&pattern).await?;
        }
        debug!("fleet reset");
        Ok(())
    }

    /// Summarizes a peer's log as it stands now.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub async fn summarize(&self, peer: &PeerId) -> Result<EventSummary> {
        let lines = self.ctx.fleet().historical_log(peer).await?;
        let events = self
            .ctx
            .classifier()
            .classify_all(peer, lines.iter().map(String::as_str));
        Ok(EventSummary::of(&events))
    }

    async fn execute(&self, name: &str, plan: &CasePlan) -> Result<VerificationReport> {
        let args = plan.launch_args();
        // One deadline bounds every observation phase of the case.
        let deadline = Instant::now() + self.ctx.config().timing.scenario_timeout();
        match plan {
            CasePlan::TotalOrder { config } => {
                self.total_order(name, config, &args, deadline).await
            }
            CasePlan::JoinViews => self.join_views(name, &args, deadline).await,
            CasePlan::Crashes { schedule } => {
                self.crashes(name, schedule, &args, deadline).await
            }
            CasePlan::LeaderFailure { config } => {
                self.leader_failure(name, config, &args, deadline).await
            }
        }
    }

    async fn launch(&self, peer: &PeerId, args: &[String]) -> Result<()> {
        self.ctx.fleet().launch(peer, args).await?;
        self.await_running(peer).await
    }

    /// Polls the fleet until `peer` is listed as running.
    async fn await_running(&self, peer: &PeerId) -> Result<()> {
        let timing = &self.ctx.config().timing;
        let pattern = NamePattern::peer(peer);
        for attempt in 1..=timing.startup_poll_attempts {
            if self.ctx.fleet().running(&pattern).await?.contains(peer) {
                debug!(%peer, attempt, "peer running");
                return Ok(());
            }
            tokio::time::sleep(timing.startup_poll_interval()).await;
        }
        Err(Error::StartupTimeout {
            peer: peer.clone(),
            attempts: timing.startup_poll_attempts,
        })
    }

    async fn total_order(
        &self,
        name: &str,
        config: &ScenarioConfig,
        args: &[String],
        deadline: Instant,
    ) -> Result<VerificationReport> {
        let hosts = self.ctx.hosts();
        config.validate(hosts)?;
        for host in hosts {
            self.launch(host, args).await?;
        }

        let target = config.expected_deliveries();
        info!(scenario = name, target, "waiting for deliveries");
        let results = self
            .ctx
            .collector()
            .collect(
                hosts,
                |_, _| StopPredicate::count(EventKind::MessageDelivered, target),
                Some(deadline),
            )
            .await
            .into_results()?;
        Ok(Verifier::total_order(name, &results))
    }

    /// Launches hosts in rank order, waiting for each one's first view.
    ///
    /// Stops at the first peer that installs no view before the deadline;
    /// the returned observations then end with that incomplete one.
    async fn join_sequentially(
        &self,
        args: &[String],
        deadline: Instant,
    ) -> Result<Vec<ObservationResult>> {
        let collector = self.ctx.collector();
        let mut joins = Vec::with_capacity(self.ctx.hosts().len());
        for host in self.ctx.hosts() {
            self.launch(host, args).await?;
            let joined = collector
                .reader(host.clone())
                .observe(
                    StopPredicate::first(EventKind::ViewInstalled),
                    Some(deadline),
                )
                .await?;
            let complete = joined.is_complete();
            joins.push(joined);
            if !complete {
                warn!(peer = %host, "peer installed no view");
                break;
            }
            debug!(peer = %host, "peer joined");
        }
        Ok(joins)
    }

    async fn join_views(
        &self,
        name: &str,
        args: &[String],
        deadline: Instant,
    ) -> Result<VerificationReport> {
        let joins = self.join_sequentially(args, deadline).await?;
        let mut report = Verifier::observations(name, &joins);
        if !report.is_passed() {
            return Ok(report);
        }
        let observed = self.count_events(EventKind::ViewInstalled).await?;
        report.merge(Verifier::view_counts(name, &observed)?);
        Ok(report)
    }

    async fn crashes(
        &self,
        name: &str,
        schedule: &CrashSchedule,
        args: &[String],
        deadline: Instant,
    ) -> Result<VerificationReport> {
        let hosts = self.ctx.hosts();
        schedule.validate(hosts.len())?;
        let joins = self.join_sequentially(args, deadline).await?;
        let mut report = Verifier::observations(name, &joins);
        if !report.is_passed() {
            return Ok(report);
        }

        let leader = &hosts[0];
        let ranks = schedule.ranks();
        let settle = self.ctx.config().timing.settle_delay();
        for (step_index, step) in schedule.steps.iter().enumerate() {
            let peer = &hosts[step.rank];
            info!(%peer, rank = step.rank, "stopping peer");
            self.ctx.fleet().stop(&NamePattern::peer(peer)).await?;

            if step.wait == WaitCondition::LeaderDetects {
                let expected = expected_unreachable_counts(hosts.len(), &ranks[..=step_index])?
                    .first()
                    .copied()
                    .flatten()
                    .unwrap_or(0);
                let seen = self
                    .ctx
                    .collector()
                    .reader(leader.clone())
                    .observe(
                        StopPredicate::count(EventKind::PeerUnreachable, expected),
                        Some(deadline),
                    )
                    .await?;
                // A short wait shows up later as a crash-count mismatch.
                if !seen.is_complete() {
                    warn!(%leader, expected, seen = seen.len(), "leader missed a crash");
                }
            }
            tokio::time::sleep(settle).await;
        }

        let observed = self.count_events(EventKind::PeerUnreachable).await?;
        report.merge(Verifier::crash_counts(name, hosts.len(), &ranks, &observed)?);
        Ok(report)
    }

    async fn leader_failure(
        &self,
        name: &str,
        config: &ScenarioConfig,
        args: &[String],
        deadline: Instant,
    ) -> Result<VerificationReport> {
        let hosts = self.ctx.hosts();
        config.validate(hosts)?;
        let joins = self.join_sequentially(args, deadline).await?;
        let mut report = Verifier::observations(name, &joins);
        if !report.is_passed() {
            return Ok(report);
        }

        let results = self
            .ctx
            .collector()
            .collect(
                hosts,
                |rank, _| {
                    if rank == 0 {
                        StopPredicate::first(EventKind::LeaderCrashSignal)
                    } else {
                        StopPredicate::first(EventKind::PeerUnreachable)
                    }
                },
                Some(deadline),
            )
            .await
            .into_results()?;
        report.merge(Verifier::observations(name, &results));
        if !report.is_passed() {
            return Ok(report);
        }

        // The leader's own exit counts as the only crash.
        tokio::time::sleep(self.ctx.config().timing.settle_delay()).await;
        let observed = self.count_events(EventKind::PeerUnreachable).await?;
        report.merge(Verifier::crash_counts(name, hosts.len(), &[0], &observed)?);
        Ok(report)
    }

    /// Counts events of `kind` in every host's log, in rank order.
    async fn count_events(&self, kind: EventKind) -> Result<Vec<ObservedCount>> {
        let mut observed = Vec::with_capacity(self.ctx.hosts().len());
        for (rank, host) in self.ctx.hosts().iter().enumerate() {
            let count = self.summarize(host).await?.count(kind);
            debug!(peer = %host, %kind, count, "counted events");
            observed.push(ObservedCount::new(rank, host.clone(), count));
        }
        Ok(observed)
    }
}
