use std::sync::Arc;

use thiserror::Error;

use stockpile_catalog::Product;
use stockpile_core::{EmailAddress, ProductId};

use crate::order::OrderRecord;

/// Reservation outcome errors.
///
/// `ProductNotFound` and `OutOfStock` are denial errors: expected,
/// user-facing, terminal. `Contention` and `Storage` are infrastructure
/// failures surfaced after the store's own retry policy is exhausted.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("product not found")]
    ProductNotFound,

    #[error("out of stock")]
    OutOfStock,

    #[error("reservation contention not resolved after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Non-reservation store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Durable stock ledger + order journal.
///
/// Implementations must make `reserve` a single atomic unit against the
/// backing store: no concurrent `reserve` on the same product may observe
/// or act on an intermediate state. Correctness rests on the store's own
/// transactional primitive (optimistic CAS retry, database transaction),
/// never on a process-local lock held across the whole operation, because
/// the ledger must stay correct across multiple service instances.
pub trait StockStore: Send + Sync {
    /// Atomically check-and-decrement stock for `product_id` and append the
    /// resulting order to the journal.
    ///
    /// Guarantee: for N concurrent calls on a product with quantity Q,
    /// exactly `min(N, Q)` succeed and the rest fail with `OutOfStock`;
    /// quantity never goes negative.
    fn reserve(
        &self,
        buyer_email: &EmailAddress,
        product_id: &ProductId,
    ) -> Result<OrderRecord, ReservationError>;

    /// Fetch a product record. `Ok(None)` means the product does not exist.
    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError>;

    /// Insert or replace a product record (seeding/admin surface; not part
    /// of the reservation path).
    fn upsert_product(&self, product: Product) -> Result<(), StoreError>;

    /// Enumerate the full order journal, oldest first.
    fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn reserve(
        &self,
        buyer_email: &EmailAddress,
        product_id: &ProductId,
    ) -> Result<OrderRecord, ReservationError> {
        (**self).reserve(buyer_email, product_id)
    }

    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(product_id)
    }

    fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        (**self).upsert_product(product)
    }

    fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        (**self).list_orders()
    }
}
