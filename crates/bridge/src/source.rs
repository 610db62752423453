//! Detection sources: where the watcher learns about journal entries.
//!
//! Push subscription and interval polling are two strategies satisfying the
//! same contract. The watcher's seen-set performs the set-difference, so a
//! source is free to re-deliver entries it has already delivered (a poll
//! source re-delivers the whole journal every cycle).

use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use stockpile_ledger::{InMemoryStockStore, OrderFeed, OrderRecord, StockStore};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("journal read failed: {0}")]
    Storage(String),

    /// The source can never produce entries again (e.g. the push feed's
    /// sender side is gone). The watcher stops on this.
    #[error("detection source disconnected")]
    Disconnected,
}

/// A stream of observed order journal entries.
pub trait DetectionSource: Send {
    /// Enumerate every entry currently in the journal (watcher seeding).
    fn snapshot(&mut self) -> Result<Vec<OrderRecord>, SourceError>;

    /// Produce the next batch of observed entries, blocking for at most
    /// `wait`. An empty batch is normal (nothing observed this cycle).
    fn next_batch(&mut self, wait: Duration) -> Result<Vec<OrderRecord>, SourceError>;
}

/// Fixed-interval full re-scan of the journal.
///
/// Backend-agnostic: works against any [`StockStore`]. Between polls,
/// `next_batch` just sleeps out its wait budget and returns nothing.
pub struct PollingSource<S> {
    store: S,
    interval: Duration,
    last_poll: Option<Instant>,
}

impl<S> PollingSource<S>
where
    S: StockStore,
{
    pub fn new(store: S, interval: Duration) -> Self {
        Self {
            store,
            interval,
            last_poll: None,
        }
    }
}

impl<S> DetectionSource for PollingSource<S>
where
    S: StockStore,
{
    fn snapshot(&mut self) -> Result<Vec<OrderRecord>, SourceError> {
        self.store
            .list_orders()
            .map_err(|e| SourceError::Storage(e.to_string()))
    }

    fn next_batch(&mut self, wait: Duration) -> Result<Vec<OrderRecord>, SourceError> {
        let due = match self.last_poll {
            None => true,
            Some(at) => at.elapsed() >= self.interval,
        };
        if !due {
            thread::sleep(wait);
            return Ok(Vec::new());
        }

        self.last_poll = Some(Instant::now());
        self.store
            .list_orders()
            .map_err(|e| SourceError::Storage(e.to_string()))
    }
}

/// Push subscription to the in-memory store's order feed.
///
/// In-process deployments only; the feed and the journal live in the same
/// address space. Seeding still snapshots the journal so entries appended
/// before the watcher started are marked seen, never forwarded.
pub struct PushSource {
    store: Arc<InMemoryStockStore>,
    feed: OrderFeed,
}

impl PushSource {
    /// Subscribes before snapshotting, so an entry appended in between
    /// shows up in both; the watcher's seen-set absorbs the overlap.
    pub fn new(store: Arc<InMemoryStockStore>) -> Self {
        let feed = store.subscribe();
        Self { store, feed }
    }
}

impl DetectionSource for PushSource {
    fn snapshot(&mut self) -> Result<Vec<OrderRecord>, SourceError> {
        self.store
            .list_orders()
            .map_err(|e| SourceError::Storage(e.to_string()))
    }

    fn next_batch(&mut self, wait: Duration) -> Result<Vec<OrderRecord>, SourceError> {
        let mut batch = Vec::new();
        match self.feed.recv_timeout(wait) {
            Ok(record) => batch.push(record),
            Err(RecvTimeoutError::Timeout) => return Ok(batch),
            Err(RecvTimeoutError::Disconnected) => return Err(SourceError::Disconnected),
        }
        // Drain whatever else arrived without blocking again.
        while let Ok(record) = self.feed.try_recv() {
            batch.push(record);
        }
        Ok(batch)
    }
}
