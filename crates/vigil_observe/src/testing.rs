//! Scripted transports for unit tests.

use crate::error::{Error, Result};
use crate::transport::{LogSubscription, LogTransport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vigil_events::PeerId;

/// What a scripted subscription does after its last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    End,
    Fail,
    Hang,
}

/// Counts closes across every subscription sharing it.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    closes: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl Tally {
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSubscription {
    lines: VecDeque<String>,
    tail: Tail,
    tally: Tally,
}

impl ScriptedSubscription {
    pub fn new<I, S>(lines: I) -> (Self, Tally)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_tail(lines, Tail::End)
    }

    pub fn failing<I, S>(lines: I) -> (Self, Tally)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_tail(lines, Tail::Fail)
    }

    pub fn with_tail<I, S>(lines: I, tail: Tail) -> (Self, Tally)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tally = Tally::default();
        (Self::with_tally(lines, tail, tally.clone()), tally)
    }

    fn with_tally<I, S>(lines: I, tail: Tail, tally: Tally) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tally.opens.fetch_add(1, Ordering::SeqCst);
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            tail,
            tally,
        }
    }
}

#[async_trait]
impl LogSubscription for ScriptedSubscription {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        if let Some(line) = self.lines.pop_front() {
            return Ok(Some(line));
        }
        match self.tail {
            Tail::End => Ok(None),
            Tail::Fail => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "log stream broke",
            )),
            Tail::Hang => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> std::io::Result<()> {
        self.tally.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport serving fixed scripts per peer.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: HashMap<PeerId, (Vec<String>, Tail)>,
    tallies: HashMap<PeerId, Tally>,
}

impl ScriptedTransport {
    pub fn script<S: Into<String>>(
        mut self,
        peer: &str,
        lines: impl IntoIterator<Item = S>,
        tail: Tail,
    ) -> Self {
        let peer = PeerId::new(peer);
        let lines = lines.into_iter().map(Into::into).collect();
        self.tallies.insert(peer.clone(), Tally::default());
        self.scripts.insert(peer, (lines, tail));
        self
    }

    pub fn tally(&self, peer: &str) -> Tally {
        self.tallies.get(&PeerId::new(peer)).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LogTransport for ScriptedTransport {
    async fn live_log(&self, peer: &PeerId) -> Result<Box<dyn LogSubscription>> {
        let (lines, tail) = self
            .scripts
            .get(peer)
            .ok_or_else(|| Error::transport(peer, "unknown peer"))?;
        let tally = self.tally(peer.as_str());
        Ok(Box::new(ScriptedSubscription::with_tally(
            lines.clone(),
            *tail,
            tally,
        )))
    }

    async fn historical_log(&self, peer: &PeerId) -> Result<Vec<String>> {
        self.scripts
            .get(peer)
            .map(|(lines, _)| lines.clone())
            .ok_or_else(|| Error::transport(peer, "unknown peer"))
    }
}
