use serde::{Deserialize, Serialize};

use stockpile_core::{EmailAddress, OrderId, ProductId};

/// An order journal entry.
///
/// Created exactly once, atomically with the product decrement, by a
/// successful reservation. The journal is append-only: entries are never
/// mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    order_id: OrderId,
    buyer_email: EmailAddress,
    product_id: ProductId,
}

impl OrderRecord {
    pub fn new(order_id: OrderId, buyer_email: EmailAddress, product_id: ProductId) -> Self {
        Self {
            order_id,
            buyer_email,
            product_id,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn buyer_email(&self) -> &EmailAddress {
        &self.buyer_email
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }
}
