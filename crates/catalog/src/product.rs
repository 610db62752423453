use serde::{Deserialize, Serialize};

use stockpile_core::{DomainError, DomainResult, ProductId};

/// Stock availability, derived from the remaining quantity.
///
/// Invariant: `OutOfStock ⟺ quantity == 0`. The status is stored alongside
/// the quantity (not recomputed by readers) so it must be recomputed on
/// every mutation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn for_quantity(quantity: u32) -> Self {
        if quantity == 0 {
            StockStatus::OutOfStock
        } else {
            StockStatus::InStock
        }
    }
}

/// A stocked catalog product.
///
/// Created by a seeding/admin process; mutated only by reservation
/// (one-unit decrement); never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    product_id: ProductId,
    product_name: String,
    quantity: u32,
    status: StockStatus,
}

impl Product {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
    ) -> DomainResult<Self> {
        let product_name = product_name.into();
        if product_name.trim().is_empty() {
            return Err(DomainError::validation("product_name cannot be empty"));
        }
        Ok(Self {
            product_id,
            product_name,
            quantity,
            status: StockStatus::for_quantity(quantity),
        })
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn status(&self) -> StockStatus {
        self.status
    }

    pub fn is_in_stock(&self) -> bool {
        self.status == StockStatus::InStock
    }

    /// Take one unit of stock.
    ///
    /// Fails when nothing is left; quantity can never go below zero. The
    /// status is recomputed from the new quantity, keeping the derived-status
    /// invariant intact.
    pub fn reserve_one(&mut self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.quantity -= 1;
        self.status = StockStatus::for_quantity(self.quantity);
        Ok(())
    }
}
