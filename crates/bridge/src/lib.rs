//! Order change watcher + event forwarder.
//!
//! Observes the order journal for newly appended entries, deduplicates
//! against entries already seen in this process's lifetime, and hands each
//! new entry to the forwarder exactly once. Forwarding is fire-and-forget:
//! failures are logged, never retried, and never fed back into the watcher
//! or the ledger.
//!
//! Delivery guarantee is deliberately weak: *at most once per process
//! lifetime*, not globally exactly-once. The seen-set is not persisted; a
//! restart re-seeds from the current journal and will not re-notify for
//! entries that existed before the restart.

pub mod forwarder;
pub mod seen;
pub mod source;
pub mod watcher;

pub use forwarder::{EventForwarder, ForwardError, HttpEventForwarder, OrderEvent, RecordingForwarder};
pub use seen::{InMemorySeenSet, SeenSet};
pub use source::{DetectionSource, PollingSource, PushSource, SourceError};
pub use watcher::{OrderWatcher, WatcherConfig, WatcherHandle};
