//! The watcher loop: seed, then watch.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::forwarder::{EventForwarder, OrderEvent};
use crate::seen::SeenSet;
use crate::source::{DetectionSource, SourceError};

/// Watcher loop configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Upper bound on how long one cycle blocks waiting for entries; also
    /// the shutdown-response latency.
    pub tick: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
        }
    }
}

/// Handle to control and join the running watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WatcherHandle {
    /// Request graceful shutdown and wait for the watcher to stop.
    ///
    /// An in-flight forwarding call is allowed to complete; no new cycles
    /// are started.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Order journal watcher.
///
/// Lifecycle: Uninitialized → Seeding → Watching. Seeding runs once and
/// marks every entry already in the journal as seen, so the watcher's
/// contract is "forward orders created after I started observing", not
/// "forward all orders ever". One active watcher per journal: running a
/// second instance would forward every entry twice.
#[derive(Debug)]
pub struct OrderWatcher;

impl OrderWatcher {
    /// Spawn the watcher thread.
    ///
    /// - `source`: where journal entries are observed (poll or push)
    /// - `seen`: dedup state, process-local
    /// - `forwarder`: forwarding errors are logged and the entry stays
    ///   seen (no retry)
    pub fn spawn<D, S, F>(
        name: &'static str,
        config: WatcherConfig,
        source: D,
        seen: S,
        forwarder: F,
    ) -> WatcherHandle
    where
        D: DetectionSource + 'static,
        S: SeenSet + 'static,
        F: EventForwarder + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || watcher_loop(name, config, source, seen, forwarder, shutdown_rx))
            .expect("failed to spawn order watcher thread");

        WatcherHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn watcher_loop<D, S, F>(
    name: &'static str,
    config: WatcherConfig,
    mut source: D,
    mut seen: S,
    forwarder: F,
    shutdown_rx: mpsc::Receiver<()>,
) where
    D: DetectionSource,
    S: SeenSet,
    F: EventForwarder,
{
    info!(watcher = name, "order watcher starting");

    // Seeding: mark every pre-existing entry seen. Retried until it
    // succeeds; watching must not start against an unseeded journal.
    loop {
        if shutdown_rx.try_recv().is_ok() {
            info!(watcher = name, "order watcher stopped before seeding");
            return;
        }
        match source.snapshot() {
            Ok(existing) => {
                for record in &existing {
                    seen.mark_seen(record.order_id());
                }
                info!(watcher = name, entries = existing.len(), "seeded from journal");
                break;
            }
            Err(e) => {
                warn!(watcher = name, error = %e, "journal snapshot failed, retrying");
                thread::sleep(config.tick);
            }
        }
    }

    // Watching.
    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let batch = match source.next_batch(config.tick) {
            Ok(batch) => batch,
            Err(SourceError::Disconnected) => {
                warn!(watcher = name, "detection source disconnected");
                break;
            }
            Err(e) => {
                warn!(watcher = name, error = %e, "detection cycle failed");
                continue;
            }
        };

        for record in batch {
            // Mark before forwarding: an entry triggers forwarding at most
            // once per process lifetime, even if the forward fails.
            if !seen.mark_seen(record.order_id()) {
                continue;
            }

            let event = OrderEvent::from_record(&record);
            info!(watcher = name, order_id = %event.order_id, "new order detected");
            if let Err(e) = forwarder.forward(&event) {
                // Accepted gap: the order stays seen and goes unnotified.
                warn!(watcher = name, order_id = %event.order_id, error = %e, "forwarding failed");
            }
        }
    }

    info!(watcher = name, "order watcher stopped");
}
