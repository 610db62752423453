//! Stock ledger and order journal.
//!
//! The ledger owns the one operation with a real correctness hazard:
//! atomically checking and decrementing product stock while appending the
//! corresponding order journal entry. Two backends implement the same
//! [`StockStore`] contract:
//!
//! - [`InMemoryStockStore`]: versioned records with an optimistic
//!   compare-and-swap retry loop (tests/dev).
//! - [`PostgresStockStore`]: a single database transaction with a
//!   conditional decrement (production).

pub mod in_memory;
pub mod order;
pub mod postgres;
pub mod store;

pub use in_memory::{InMemoryStockStore, OrderFeed};
pub use order::OrderRecord;
pub use postgres::PostgresStockStore;
pub use store::{ReservationError, StockStore, StoreError};
