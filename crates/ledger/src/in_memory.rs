//! In-memory stock store.
//!
//! Intended for tests/dev. Reservation is expressed as an optimistic
//! compare-and-swap loop over versioned product records: read a snapshot,
//! apply the decrement, commit only if the version is unchanged, retry on
//! conflict. The commit section holds the products write lock while the
//! journal entry is appended, so the decrement and the append form one
//! atomic unit.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock, mpsc};
use std::time::Duration;

use stockpile_catalog::Product;
use stockpile_core::{EmailAddress, OrderId, ProductId};

use crate::order::OrderRecord;
use crate::store::{ReservationError, StockStore, StoreError};

/// Internal retry policy for optimistic commits.
const MAX_CAS_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone)]
struct VersionedProduct {
    version: u64,
    record: Product,
}

/// A push feed of newly appended journal entries.
///
/// Each feed receives a copy of every order appended after it subscribed.
/// Best-effort fan-out; dropped receivers are pruned on publish.
#[derive(Debug)]
pub struct OrderFeed {
    receiver: mpsc::Receiver<OrderRecord>,
}

impl OrderFeed {
    /// Try to receive an appended order without blocking.
    pub fn try_recv(&self) -> Result<OrderRecord, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for an appended order.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<OrderRecord, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// In-memory stock ledger + order journal.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    products: RwLock<HashMap<ProductId, VersionedProduct>>,
    orders: RwLock<Vec<OrderRecord>>,
    feeds: Mutex<Vec<mpsc::Sender<OrderRecord>>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to journal appends (push detection source).
    pub fn subscribe(&self) -> OrderFeed {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a feed; it just won't
        // receive entries until the process restarts.
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.push(tx);
        }

        OrderFeed { receiver: rx }
    }

    fn publish(&self, order: &OrderRecord) {
        if let Ok(mut feeds) = self.feeds.lock() {
            // Drop any dead subscribers while publishing.
            feeds.retain(|tx| tx.send(order.clone()).is_ok());
        }
    }
}

fn poisoned() -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

impl StockStore for InMemoryStockStore {
    fn reserve(
        &self,
        buyer_email: &EmailAddress,
        product_id: &ProductId,
    ) -> Result<OrderRecord, ReservationError> {
        for _attempt in 1..=MAX_CAS_ATTEMPTS {
            // Snapshot phase: read the current version + record.
            let (read_version, mut product) = {
                let products = self
                    .products
                    .read()
                    .map_err(|_| ReservationError::Storage("lock poisoned".to_string()))?;
                match products.get(product_id) {
                    None => return Err(ReservationError::ProductNotFound),
                    Some(v) => (v.version, v.record.clone()),
                }
            };

            if product.quantity() == 0 {
                return Err(ReservationError::OutOfStock);
            }
            product
                .reserve_one()
                .map_err(|e| ReservationError::Storage(e.to_string()))?;

            // Commit phase: re-check the version under the write lock and
            // append the journal entry in the same critical section.
            let mut products = self
                .products
                .write()
                .map_err(|_| ReservationError::Storage("lock poisoned".to_string()))?;
            let Some(entry) = products.get_mut(product_id) else {
                return Err(ReservationError::ProductNotFound);
            };
            if entry.version != read_version {
                // Another reservation committed in between; retry from a
                // fresh snapshot.
                continue;
            }
            entry.version += 1;
            entry.record = product;

            let order = OrderRecord::new(OrderId::new(), buyer_email.clone(), product_id.clone());
            self.orders
                .write()
                .map_err(|_| ReservationError::Storage("lock poisoned".to_string()))?
                .push(order.clone());
            drop(products);

            self.publish(&order);
            return Ok(order);
        }

        Err(ReservationError::Contention {
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(product_id).map(|v| v.record.clone()))
    }

    fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        let entry = products
            .entry(product.product_id().clone())
            .or_insert_with(|| VersionedProduct {
                version: 0,
                record: product.clone(),
            });
        entry.version += 1;
        entry.record = product;
        Ok(())
    }

    fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.orders.read().map_err(|_| poisoned())?.clone())
    }
}

impl stockpile_catalog::ProductReader for InMemoryStockStore {
    fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Product>, stockpile_catalog::ReaderError> {
        StockStore::get_product(self, product_id)
            .map_err(|e| stockpile_catalog::ReaderError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use stockpile_catalog::StockStatus;

    use super::*;

    fn email(addr: &str) -> EmailAddress {
        EmailAddress::parse(addr).unwrap()
    }

    fn pid(id: &str) -> ProductId {
        ProductId::new(id).unwrap()
    }

    fn seeded(quantity: u32) -> InMemoryStockStore {
        let store = InMemoryStockStore::new();
        store
            .upsert_product(Product::new(pid("p1"), "Red Widget", quantity).unwrap())
            .unwrap();
        store
    }

    #[test]
    fn reserve_decrements_once_and_appends_one_order() {
        let store = seeded(5);

        let order = store.reserve(&email("a@example.com"), &pid("p1")).unwrap();

        let product = store.get_product(&pid("p1")).unwrap().unwrap();
        assert_eq!(product.quantity(), 4);
        assert_eq!(product.status(), StockStatus::InStock);

        let orders = store.list_orders().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id(), order.order_id());
        assert_eq!(orders[0].buyer_email().as_str(), "a@example.com");
        assert_eq!(orders[0].product_id(), &pid("p1"));
    }

    #[test]
    fn reserve_unknown_product_is_terminal_and_side_effect_free() {
        let store = seeded(5);

        let err = store
            .reserve(&email("a@example.com"), &pid("ghost"))
            .unwrap_err();
        assert!(matches!(err, ReservationError::ProductNotFound));

        assert!(store.list_orders().unwrap().is_empty());
        assert_eq!(store.get_product(&pid("p1")).unwrap().unwrap().quantity(), 5);
    }

    #[test]
    fn reserve_at_zero_fails_with_out_of_stock() {
        let store = seeded(0);

        let err = store
            .reserve(&email("a@example.com"), &pid("p1"))
            .unwrap_err();
        assert!(matches!(err, ReservationError::OutOfStock));
        assert!(store.list_orders().unwrap().is_empty());
    }

    #[test]
    fn concurrent_reservations_never_oversell() {
        const QUANTITY: u32 = 3;
        const CALLERS: usize = 16;

        let store = Arc::new(seeded(QUANTITY));

        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let store = store.clone();
                thread::spawn(move || {
                    store.reserve(&email(&format!("buyer{i}@example.com")), &pid("p1"))
                })
            })
            .collect();

        let mut successes = 0usize;
        let mut out_of_stock = 0usize;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => successes += 1,
                Err(ReservationError::OutOfStock) => out_of_stock += 1,
                Err(other) => panic!("unexpected reservation failure: {other}"),
            }
        }

        assert_eq!(successes, QUANTITY as usize);
        assert_eq!(out_of_stock, CALLERS - QUANTITY as usize);

        let product = store.get_product(&pid("p1")).unwrap().unwrap();
        assert_eq!(product.quantity(), 0);
        assert_eq!(product.status(), StockStatus::OutOfStock);
        assert_eq!(store.list_orders().unwrap().len(), QUANTITY as usize);
    }

    #[test]
    fn last_unit_goes_to_exactly_one_of_two_buyers() {
        let store = Arc::new(seeded(1));

        let a = {
            let store = store.clone();
            thread::spawn(move || store.reserve(&email("buyer_a@example.com"), &pid("p1")))
        };
        let b = {
            let store = store.clone();
            thread::spawn(move || store.reserve(&email("buyer_b@example.com"), &pid("p1")))
        };

        let results = [a.join().unwrap(), b.join().unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let denials = results
            .iter()
            .filter(|r| matches!(r, Err(ReservationError::OutOfStock)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(denials, 1);

        let product = store.get_product(&pid("p1")).unwrap().unwrap();
        assert_eq!(product.quantity(), 0);
        assert_eq!(product.status(), StockStatus::OutOfStock);
        assert_eq!(store.list_orders().unwrap().len(), 1);
    }

    #[test]
    fn feed_receives_appends_made_after_subscribing() {
        let store = seeded(3);
        store.reserve(&email("before@example.com"), &pid("p1")).unwrap();

        let feed = store.subscribe();
        let order = store.reserve(&email("after@example.com"), &pid("p1")).unwrap();

        let received = feed.try_recv().unwrap();
        assert_eq!(received.order_id(), order.order_id());
        assert!(feed.try_recv().is_err());
    }
}
