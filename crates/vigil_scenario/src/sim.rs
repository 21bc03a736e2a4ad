//! Simulated system under test.
//!
//! [`SimulatedSut`] plays a correct total-order multicast and membership
//! service on top of a [`MemoryFleet`](vigil_fleet::MemoryFleet): it reads
//! the same launch arguments a real peer would and writes the glog lines a
//! real peer would print. [`Fault`]s make chosen ranks misbehave so the
//! verifier has something to catch.
//!
//! Peer ids are 1-based join ranks, as in the hostfile.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Mutex, PoisonError};
use tracing::debug;
use vigil_events::PeerId;
use vigil_fleet::{GlogLine, LogBook, PeerBehaviour};

/// Misbehaviour injected at one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Delivers the first two messages in swapped order.
    SwapDeliveries {
        /// Misbehaving rank.
        rank: usize,
    },
    /// Never reports unreachable peers.
    MissedCrashes {
        /// Misbehaving rank.
        rank: usize,
    },
    /// Installs every view twice.
    DuplicateViews {
        /// Misbehaving rank.
        rank: usize,
    },
    /// Reports every unreachable peer twice.
    RepeatedDetections {
        /// Misbehaving rank.
        rank: usize,
    },
}

/// Launch flags a simulated peer understands.
#[derive(Debug, Default, PartialEq, Eq)]
struct PeerArgs {
    senders: Vec<String>,
    message_count: u32,
    leader_failure_demo: bool,
}

impl PeerArgs {
    fn parse(args: &[String]) -> Self {
        let mut parsed = Self::default();
        let mut args = args.iter();
        while let Some(flag) = args.next() {
            match flag.as_str() {
                "--senders" => {
                    parsed.senders = args
                        .next()
                        .map(|list| {
                            list.split(',')
                                .filter(|s| !s.is_empty())
                                .map(String::from)
                                .collect()
                        })
                        .unwrap_or_default();
                }
                "--msgCount" => {
                    parsed.message_count = args.next().and_then(|n| n.parse().ok()).unwrap_or(0);
                }
                "--leaderFailureDemo" => parsed.leader_failure_demo = true,
                _ => {}
            }
        }
        parsed
    }
}

#[derive(Debug, Default)]
struct Round {
    runs: u64,
    view_id: u32,
    delivered: bool,
    leader_exited: bool,
}

/// A well-behaved protocol, optionally with faults.
#[derive(Debug)]
pub struct SimulatedSut {
    hosts: Vec<PeerId>,
    seed: u64,
    faults: Vec<Fault>,
    round: Mutex<Round>,
}

impl SimulatedSut {
    /// Creates a simulation of `hosts`, ordering deliveries from `seed`.
    pub fn new(hosts: Vec<PeerId>, seed: u64) -> Self {
        Self {
            hosts,
            seed,
            faults: Vec::new(),
            round: Mutex::new(Round::default()),
        }
    }

    /// Adds a fault.
    #[must_use]
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    fn rank(&self, peer: &PeerId) -> Option<usize> {
        self.hosts.iter().position(|host| host == peer)
    }

    fn id(&self, peer: &PeerId) -> usize {
        self.rank(peer).map_or(0, |rank| rank + 1)
    }

    fn faulty(&self, peer: &PeerId, fault: impl Fn(usize) -> Fault) -> bool {
        self.rank(peer)
            .is_some_and(|rank| self.faults.contains(&fault(rank)))
    }

    fn everyone_running(&self, running: &[PeerId]) -> bool {
        self.hosts.iter().all(|host| running.contains(host))
    }

    /// Messages in the order the sequencer assigns them.
    fn delivery_order(&self, args: &PeerArgs, run: u64) -> Vec<String> {
        let mut messages: Vec<(usize, u32)> = args
            .senders
            .iter()
            .map(|sender| self.id(&PeerId::new(sender.as_str())))
            .flat_map(|sender| (1..=args.message_count).map(move |msg_id| (sender, msg_id)))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(run));
        messages.shuffle(&mut rng);
        messages
            .into_iter()
            .enumerate()
            .map(|(seq, (sender, msg_id))| {
                format!(
                    "delivering dataMsg: {{sender: {sender}, msg_id: {msg_id}}}, seqMsg: {{seq: {}}}",
                    seq + 1
                )
            })
            .collect()
    }

    fn deliver(&self, book: &LogBook, running: &[PeerId], order: &[String]) {
        for peer in running {
            let mut order = order.to_vec();
            if order.len() > 1 && self.faulty(peer, |rank| Fault::SwapDeliveries { rank }) {
                order.swap(0, 1);
            }
            let thread = u32::try_from(self.id(peer)).unwrap_or(u32::MAX);
            for message in &order {
                book.append(
                    peer,
                    GlogLine::info("multicast.cpp", 430, message)
                        .thread(thread)
                        .to_string(),
                );
            }
        }
    }

    fn install_view(&self, book: &LogBook, running: &[PeerId], view_id: u32) {
        let members: Vec<String> = running.iter().map(|p| self.id(p).to_string()).collect();
        let message = format!(
            "new view installed, viewId: {view_id}, members: {{{}}}",
            members.join(", ")
        );
        for peer in running {
            let copies = if self.faulty(peer, |rank| Fault::DuplicateViews { rank }) {
                2
            } else {
                1
            };
            for _ in 0..copies {
                book.append(peer, GlogLine::info("membership.cpp", 229, &message).to_string());
            }
        }
        if let Some(leader) = running.first().filter(|_| running.len() > 1) {
            book.append(
                leader,
                GlogLine::info("membership.cpp", 268, "newViewMsg delivered to all peers")
                    .to_string(),
            );
        }
    }

    fn report_unreachable(&self, book: &LogBook, gone: &PeerId) {
        let message = format!("Peer: {} is not reachable", self.id(gone));
        for peer in book.running() {
            let copies = if self.faulty(&peer, |rank| Fault::MissedCrashes { rank }) {
                0
            } else if self.faulty(&peer, |rank| Fault::RepeatedDetections { rank }) {
                2
            } else {
                1
            };
            for _ in 0..copies {
                book.append(
                    &peer,
                    GlogLine::warning("failure_detector.cpp", 82, &message).to_string(),
                );
            }
        }
    }
}

impl PeerBehaviour for SimulatedSut {
    fn on_launch(&self, book: &LogBook, peer: &PeerId, args: &[String]) {
        let running = book.running();
        let args = PeerArgs::parse(args);

        let (run, view_id, deliver, demo) = {
            let mut round = self.round.lock().unwrap_or_else(PoisonError::into_inner);
            if running.len() == 1 {
                *round = Round {
                    runs: round.runs + 1,
                    ..Round::default()
                };
            }
            let complete = self.everyone_running(&running);
            round.view_id += 1;
            let deliver = complete && !args.senders.is_empty() && !round.delivered;
            round.delivered |= deliver;
            let demo = complete && args.leader_failure_demo && !round.leader_exited;
            round.leader_exited |= demo;
            (round.runs, round.view_id, deliver, demo)
        };
        debug!(%peer, running = running.len(), view_id, "simulated peer joined");

        if args.senders.is_empty() {
            self.install_view(book, &running, view_id);
        } else if deliver {
            let order = self.delivery_order(&args, run);
            self.deliver(book, &running, &order);
        }

        if demo {
            if let Some(leader) = running.first() {
                book.append(
                    leader,
                    GlogLine::warning("main.cpp", 40, "leader failure demo: exiting").to_string(),
                );
                book.halt(leader);
                self.report_unreachable(book, leader);
            }
        }
    }

    fn on_stop(&self, book: &LogBook, peer: &PeerId) {
        self.report_unreachable(book, peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vigil_events::{Classifier, EventKind};
    use vigil_fleet::{MemoryFleet, NamePattern, ProcessFleet};
    use vigil_observe::LogTransport;

    fn hosts(n: usize) -> Vec<PeerId> {
        (1..=n).map(|i| PeerId::new(format!("host{i}"))).collect()
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_string()).collect()
    }

    async fn kinds(fleet: &MemoryFleet, peer: &PeerId) -> Vec<EventKind> {
        let lines = fleet.historical_log(peer).await.unwrap();
        Classifier::standard()
            .classify_all(peer, lines.iter().map(String::as_str))
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn parses_launch_flags() {
        let args = PeerArgs::parse(&strings(&[
            "--senders",
            "host1,host2",
            "--msgCount",
            "3",
            "--dropRate",
            "0.5",
            "--leaderFailureDemo",
        ]));
        assert_eq!(args.senders, vec!["host1", "host2"]);
        assert_eq!(args.message_count, 3);
        assert!(args.leader_failure_demo);
        assert_eq!(PeerArgs::parse(&[]), PeerArgs::default());
    }

    #[test]
    fn delivery_order_is_seeded() {
        let sut = SimulatedSut::new(hosts(3), 7);
        let args = PeerArgs::parse(&strings(&["--senders", "host1,host3", "--msgCount", "4"]));
        let first = sut.delivery_order(&args, 1);
        assert_eq!(first.len(), 8);
        assert_eq!(first, sut.delivery_order(&args, 1));
        assert!(first.iter().all(|m| !m.contains(']')));
        assert!(first.iter().any(|m| m.contains("sender: 3")));
    }

    #[tokio::test]
    async fn deliveries_wait_for_the_whole_group() {
        let hosts = hosts(2);
        let fleet = MemoryFleet::new(Arc::new(SimulatedSut::new(hosts.clone(), 1)));
        let args = strings(&["--senders", "host1", "--msgCount", "2"]);
        fleet.launch(&hosts[0], &args).await.unwrap();
        assert!(kinds(&fleet, &hosts[0]).await.is_empty());
        fleet.launch(&hosts[1], &args).await.unwrap();
        for host in &hosts {
            assert_eq!(
                kinds(&fleet, host).await,
                vec![EventKind::MessageDelivered; 2]
            );
        }
    }

    #[tokio::test]
    async fn stop_is_reported_by_survivors() {
        let hosts = hosts(3);
        let fleet = MemoryFleet::new(Arc::new(
            SimulatedSut::new(hosts.clone(), 1).with_fault(Fault::MissedCrashes { rank: 1 }),
        ));
        for host in &hosts {
            fleet.launch(host, &[]).await.unwrap();
        }
        fleet.stop(&NamePattern::peer(&hosts[2])).await.unwrap();

        let leader = fleet.historical_log(&hosts[0]).await.unwrap();
        assert!(leader
            .last()
            .is_some_and(|l| l.starts_with('W') && l.ends_with("] Peer: 3 is not reachable")));
        assert!(!kinds(&fleet, &hosts[1])
            .await
            .contains(&EventKind::PeerUnreachable));
    }

    #[tokio::test]
    async fn repeated_detections_report_twice() {
        let hosts = hosts(2);
        let fleet = MemoryFleet::new(Arc::new(
            SimulatedSut::new(hosts.clone(), 1).with_fault(Fault::RepeatedDetections { rank: 1 }),
        ));
        let args = strings(&["--leaderFailureDemo"]);
        fleet.launch(&hosts[0], &args).await.unwrap();
        fleet.launch(&hosts[1], &args).await.unwrap();
        assert_eq!(
            kinds(&fleet, &hosts[1]).await,
            vec![
                EventKind::ViewInstalled,
                EventKind::PeerUnreachable,
                EventKind::PeerUnreachable
            ]
        );
    }

    #[tokio::test]
    async fn leader_demo_exits_once_the_group_forms() {
        let hosts = hosts(2);
        let fleet = MemoryFleet::new(Arc::new(SimulatedSut::new(hosts.clone(), 1)));
        let args = strings(&["--leaderFailureDemo"]);
        fleet.launch(&hosts[0], &args).await.unwrap();
        fleet.launch(&hosts[1], &args).await.unwrap();

        assert!(!fleet.book().is_running(&hosts[0]));
        assert!(kinds(&fleet, &hosts[0])
            .await
            .contains(&EventKind::LeaderCrashSignal));
        assert_eq!(
            kinds(&fleet, &hosts[1]).await,
            vec![EventKind::ViewInstalled, EventKind::PeerUnreachable]
        );
    }
}
