//! In-memory fleet.
//!
//! Peers are append-only line buffers. A [`PeerBehaviour`] decides what
//! peers log when one is launched or stopped, which is enough to stand in
//! for a real system under test. Live subscriptions replay the buffer from
//! the start, then follow it until the peer stops.

use crate::error::{Error, Result};
use crate::fleet::{NamePattern, ProcessFleet};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};
use vigil_events::PeerId;
use vigil_observe::{LogSubscription, LogTransport};

/// What simulated peers log in response to fleet actions.
///
/// Hooks run after the fleet state has been updated and without any lock
/// held, so they may freely write to and halt peers through the book.
pub trait PeerBehaviour: Send + Sync {
    /// Called after `peer` has been started.
    fn on_launch(&self, book: &LogBook, peer: &PeerId, args: &[String]);

    /// Called after `peer` has been stopped by the fleet.
    fn on_stop(&self, book: &LogBook, peer: &PeerId);
}

/// Behaviour that logs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl PeerBehaviour for Silent {
    fn on_launch(&self, _book: &LogBook, _peer: &PeerId, _args: &[String]) {}

    fn on_stop(&self, _book: &LogBook, _peer: &PeerId) {}
}

/// Live-subscription accounting.
#[derive(Debug, Default)]
pub struct SubscriptionStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    dropped_open: AtomicUsize,
}

impl SubscriptionStats {
    /// Subscriptions handed out.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Subscriptions explicitly closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Subscriptions dropped without being closed.
    pub fn dropped_open(&self) -> usize {
        self.dropped_open.load(Ordering::SeqCst)
    }

    /// Subscriptions neither closed nor dropped.
    pub fn live(&self) -> usize {
        self.opened()
            .saturating_sub(self.closed() + self.dropped_open())
    }
}

#[derive(Debug)]
struct PeerLog {
    lines: Vec<String>,
    running: bool,
    launched: u64,
    changed: watch::Sender<()>,
}

#[derive(Debug, Default)]
struct BookState {
    peers: BTreeMap<PeerId, PeerLog>,
    launches: u64,
}

/// Shared log state of a [`MemoryFleet`].
#[derive(Debug, Clone, Default)]
pub struct LogBook {
    state: Arc<Mutex<BookState>>,
}

impl LogBook {
    fn lock(&self) -> MutexGuard<'_, BookState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a line to a running peer's log. Lines for stopped or unknown
    /// peers are dropped, as a dead process writes nothing.
    pub fn append(&self, peer: &PeerId, line: impl Into<String>) {
        let mut state = self.lock();
        if let Some(log) = state.peers.get_mut(peer).filter(|log| log.running) {
            log.lines.push(line.into());
            log.changed.send_replace(());
        }
    }

    /// Marks a peer as exited on its own.
    pub fn halt(&self, peer: &PeerId) {
        let mut state = self.lock();
        if let Some(log) = state.peers.get_mut(peer) {
            log.running = false;
            log.changed.send_replace(());
        }
    }

    /// Running peers in launch order.
    pub fn running(&self) -> Vec<PeerId> {
        let state = self.lock();
        let mut running: Vec<(&PeerId, u64)> = state
            .peers
            .iter()
            .filter(|(_, log)| log.running)
            .map(|(peer, log)| (peer, log.launched))
            .collect();
        running.sort_by_key(|(_, launched)| *launched);
        running.into_iter().map(|(peer, _)| peer.clone()).collect()
    }

    /// Returns true if `peer` is running.
    pub fn is_running(&self, peer: &PeerId) -> bool {
        self.lock().peers.get(peer).is_some_and(|log| log.running)
    }

    /// Snapshot of a peer's log.
    pub fn lines(&self, peer: &PeerId) -> Option<Vec<String>> {
        self.lock().peers.get(peer).map(|log| log.lines.clone())
    }

    fn start(&self, peer: &PeerId) -> Result<()> {
        let mut state = self.lock();
        if state.peers.contains_key(peer) {
            return Err(Error::CommandFailed {
                action: "launch",
                target: peer.to_string(),
                code: Some(125),
                stderr: format!("name {peer} is already in use"),
            });
        }
        state.launches += 1;
        let launched = state.launches;
        let (changed, _) = watch::channel(());
        state.peers.insert(
            peer.clone(),
            PeerLog {
                lines: Vec::new(),
                running: true,
                launched,
                changed,
            },
        );
        Ok(())
    }

    fn matching(&self, pattern: &NamePattern) -> Vec<PeerId> {
        self.lock()
            .peers
            .keys()
            .filter(|peer| pattern.matches(peer.as_str()))
            .cloned()
            .collect()
    }
}

/// Fleet keeping peers in memory.
#[derive(Clone)]
pub struct MemoryFleet {
    book: LogBook,
    behaviour: Arc<dyn PeerBehaviour>,
    stats: Arc<SubscriptionStats>,
}

impl std::fmt::Debug for MemoryFleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFleet")
            .field("book", &self.book)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryFleet {
    fn default() -> Self {
        Self::new(Arc::new(Silent))
    }
}

impl MemoryFleet {
    /// Creates a fleet whose peers act out `behaviour`.
    pub fn new(behaviour: Arc<dyn PeerBehaviour>) -> Self {
        Self {
            book: LogBook::default(),
            behaviour,
            stats: Arc::new(SubscriptionStats::default()),
        }
    }

    /// Returns the shared log state.
    pub const fn book(&self) -> &LogBook {
        &self.book
    }

    /// Returns live-subscription accounting.
    pub fn stats(&self) -> &SubscriptionStats {
        &self.stats
    }
}

#[async_trait]
impl LogTransport for MemoryFleet {
    async fn live_log(&self, peer: &PeerId) -> vigil_observe::Result<Box<dyn LogSubscription>> {
        let changed = {
            let state = self.book.lock();
            let log = state.peers.get(peer).ok_or_else(|| {
                vigil_observe::Error::transport(peer, Error::UnknownPeer(peer.clone()))
            })?;
            log.changed.subscribe()
        };
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySubscription {
            book: self.book.clone(),
            peer: peer.clone(),
            cursor: 0,
            changed,
            stats: Arc::clone(&self.stats),
            closed: false,
        }))
    }

    async fn historical_log(&self, peer: &PeerId) -> vigil_observe::Result<Vec<String>> {
        self.book
            .lines(peer)
            .ok_or_else(|| vigil_observe::Error::transport(peer, Error::UnknownPeer(peer.clone())))
    }
}

#[async_trait]
impl ProcessFleet for MemoryFleet {
    async fn launch(&self, peer: &PeerId, args: &[String]) -> Result<()> {
        self.book.start(peer)?;
        info!(%peer, "launched in-memory peer");
        self.behaviour.on_launch(&self.book, peer, args);
        Ok(())
    }

    async fn stop(&self, pattern: &NamePattern) -> Result<()> {
        for peer in self.book.matching(pattern) {
            if self.book.is_running(&peer) {
                self.book.halt(&peer);
                debug!(%peer, "stopped in-memory peer");
                self.behaviour.on_stop(&self.book, &peer);
            }
        }
        Ok(())
    }

    async fn remove(&self, pattern: &NamePattern) -> Result<()> {
        let mut state = self.book.lock();
        let targets: Vec<PeerId> = state
            .peers
            .keys()
            .filter(|peer| pattern.matches(peer.as_str()))
            .cloned()
            .collect();
        if let Some(peer) = targets.iter().find(|peer| state.peers[*peer].running) {
            return Err(Error::CommandFailed {
                action: "remove",
                target: pattern.to_string(),
                code: Some(1),
                stderr: format!("cannot remove running peer {peer}"),
            });
        }
        for peer in &targets {
            state.peers.remove(peer);
        }
        Ok(())
    }

    async fn running(&self, pattern: &NamePattern) -> Result<Vec<PeerId>> {
        Ok(self
            .book
            .running()
            .into_iter()
            .filter(|peer| pattern.matches(peer.as_str()))
            .collect())
    }

    fn log_transport(self: Arc<Self>) -> Arc<dyn LogTransport> {
        self
    }
}

struct MemorySubscription {
    book: LogBook,
    peer: PeerId,
    cursor: usize,
    changed: watch::Receiver<()>,
    stats: Arc<SubscriptionStats>,
    closed: bool,
}

enum Poll {
    Line(String),
    Ended,
    Pending,
}

impl MemorySubscription {
    fn poll_line(&mut self) -> Poll {
        let state = self.book.lock();
        let Some(log) = state.peers.get(&self.peer) else {
            return Poll::Ended;
        };
        if let Some(line) = log.lines.get(self.cursor) {
            self.cursor += 1;
            Poll::Line(line.clone())
        } else if log.running {
            Poll::Pending
        } else {
            Poll::Ended
        }
    }
}

#[async_trait]
impl LogSubscription for MemorySubscription {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if self.closed {
                return Ok(None);
            }
            self.changed.borrow_and_update();
            match self.poll_line() {
                Poll::Line(line) => return Ok(Some(line)),
                Poll::Ended => return Ok(None),
                Poll::Pending => {
                    if self.changed.changed().await.is_err() {
                        // Peer removed while following.
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn close(&mut self) -> std::io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        if !self.closed {
            self.stats.dropped_open.fetch_add(1, Ordering::SeqCst);
        }
    }
}
