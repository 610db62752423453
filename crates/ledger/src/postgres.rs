//! Postgres-backed stock store.
//!
//! Reservation is one database transaction: a conditional decrement
//! (`UPDATE ... WHERE quantity > 0`) followed by the order `INSERT`. Row
//! locking on the updated product row serializes concurrent reservations
//! for the same product, so no two callers can act on the same
//! pre-decrement quantity. This keeps the ledger correct across multiple
//! service instances sharing the database.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::{PgPool, Row};
use uuid::Uuid;

use stockpile_catalog::{Product, StockStatus};
use stockpile_core::{EmailAddress, OrderId, ProductId};

use crate::order::OrderRecord;
use crate::store::{ReservationError, StockStore, StoreError};

/// Postgres stock ledger + order journal.
///
/// Uses the SQLx connection pool (thread-safe, shareable). The [`StockStore`]
/// trait is synchronous, so the async pool operations are bridged with the
/// current tokio runtime handle; call trait methods from a blocking context
/// (e.g. `spawn_blocking`), not from an async worker thread.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
    /// Runtime handle captured at construction so the sync trait surface
    /// also works from threads outside the runtime (the watcher thread).
    handle: Option<tokio::runtime::Handle>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            handle: tokio::runtime::Handle::try_current().ok(),
        }
    }

    /// Create the products/orders tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                product_id   TEXT PRIMARY KEY,
                product_name TEXT NOT NULL,
                quantity     BIGINT NOT NULL CHECK (quantity >= 0),
                status       TEXT NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("create products table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                order_id    UUID PRIMARY KEY,
                buyer_email TEXT NOT NULL,
                product_id  TEXT NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("create orders table: {e}")))?;

        Ok(())
    }

    pub async fn reserve_async(
        &self,
        buyer_email: &EmailAddress,
        product_id: &ProductId,
    ) -> Result<OrderRecord, ReservationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReservationError::Storage(format!("begin: {e}")))?;

        // Conditional decrement. The row lock taken by UPDATE serializes
        // concurrent reservations on the same product.
        let updated = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - 1,
                status = CASE WHEN quantity - 1 = 0 THEN 'out_of_stock' ELSE 'in_stock' END
            WHERE product_id = $1 AND quantity > 0
            "#,
        )
        .bind(product_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| ReservationError::Storage(format!("decrement: {e}")))?;

        if updated.rows_affected() == 0 {
            // Distinguish "never existed" from "sold out".
            let exists = sqlx::query("SELECT 1 FROM products WHERE product_id = $1")
                .bind(product_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| ReservationError::Storage(format!("exists check: {e}")))?;
            tx.rollback()
                .await
                .map_err(|e| ReservationError::Storage(format!("rollback: {e}")))?;
            return match exists {
                None => Err(ReservationError::ProductNotFound),
                Some(_) => Err(ReservationError::OutOfStock),
            };
        }

        let order = OrderRecord::new(OrderId::new(), buyer_email.clone(), product_id.clone());
        sqlx::query(
            r#"
            INSERT INTO orders (order_id, buyer_email, product_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::from(order.order_id()))
        .bind(order.buyer_email().as_str())
        .bind(order.product_id().as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| ReservationError::Storage(format!("journal append: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| ReservationError::Storage(format!("commit: {e}")))?;

        Ok(order)
    }

    pub async fn get_product_async(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT product_id, product_name, quantity FROM products WHERE product_id = $1",
        )
        .bind(product_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("get product: {e}")))?;

        row.map(product_from_row).transpose()
    }

    pub async fn upsert_product_async(&self, product: Product) -> Result<(), StoreError> {
        let status = match product.status() {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
        };
        sqlx::query(
            r#"
            INSERT INTO products (product_id, product_name, quantity, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id)
            DO UPDATE SET product_name = $2, quantity = $3, status = $4
            "#,
        )
        .bind(product.product_id().as_str())
        .bind(product.product_name())
        .bind(i64::from(product.quantity()))
        .bind(status)
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("upsert product: {e}")))?;

        Ok(())
    }

    pub async fn list_orders_async(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let rows = sqlx::query("SELECT order_id, buyer_email, product_id FROM orders ORDER BY order_id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("list orders: {e}")))?;

        rows.into_iter().map(order_from_row).collect()
    }

    fn runtime_handle<E>(&self, err: impl Fn(String) -> E) -> Result<tokio::runtime::Handle, E> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }
        tokio::runtime::Handle::try_current().map_err(|_| {
            err(
                "PostgresStockStore requires a tokio runtime; construct or call it within a runtime context"
                    .to_string(),
            )
        })
    }
}

fn product_from_row(row: sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let product_id: String = row
        .try_get("product_id")
        .map_err(|e| StoreError::Storage(format!("read product_id: {e}")))?;
    let product_name: String = row
        .try_get("product_name")
        .map_err(|e| StoreError::Storage(format!("read product_name: {e}")))?;
    let quantity: i64 = row
        .try_get("quantity")
        .map_err(|e| StoreError::Storage(format!("read quantity: {e}")))?;

    let product_id =
        ProductId::new(product_id).map_err(|e| StoreError::Storage(e.to_string()))?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::Storage(format!("negative quantity in store: {quantity}")))?;

    Product::new(product_id, product_name, quantity).map_err(|e| StoreError::Storage(e.to_string()))
}

fn order_from_row(row: sqlx::postgres::PgRow) -> Result<OrderRecord, StoreError> {
    let order_id: Uuid = row
        .try_get("order_id")
        .map_err(|e| StoreError::Storage(format!("read order_id: {e}")))?;
    let buyer_email: String = row
        .try_get("buyer_email")
        .map_err(|e| StoreError::Storage(format!("read buyer_email: {e}")))?;
    let product_id: String = row
        .try_get("product_id")
        .map_err(|e| StoreError::Storage(format!("read product_id: {e}")))?;

    Ok(OrderRecord::new(
        OrderId::from_uuid(order_id),
        EmailAddress::parse(buyer_email).map_err(|e| StoreError::Storage(e.to_string()))?,
        ProductId::from_str(&product_id).map_err(|e| StoreError::Storage(e.to_string()))?,
    ))
}

// The StockStore trait is synchronous; bridge to the async pool with the
// captured runtime handle. `block_on` must not run on a runtime worker
// thread, so trait methods are for blocking contexts (`spawn_blocking`,
// the watcher thread), while async callers use the `*_async` methods.

impl StockStore for PostgresStockStore {
    fn reserve(
        &self,
        buyer_email: &EmailAddress,
        product_id: &ProductId,
    ) -> Result<OrderRecord, ReservationError> {
        let handle = self.runtime_handle(ReservationError::Storage)?;
        handle.block_on(self.reserve_async(buyer_email, product_id))
    }

    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        let handle = self.runtime_handle(StoreError::Storage)?;
        handle.block_on(self.get_product_async(product_id))
    }

    fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        let handle = self.runtime_handle(StoreError::Storage)?;
        handle.block_on(self.upsert_product_async(product))
    }

    fn list_orders(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let handle = self.runtime_handle(StoreError::Storage)?;
        handle.block_on(self.list_orders_async())
    }
}

impl stockpile_catalog::ProductReader for PostgresStockStore {
    fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Product>, stockpile_catalog::ReaderError> {
        StockStore::get_product(self, product_id)
            .map_err(|e| stockpile_catalog::ReaderError::Storage(e.to_string()))
    }
}
