use std::sync::Arc;

use thiserror::Error;

use stockpile_core::ProductId;

use crate::Product;

/// Read-side failure when resolving a product.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("catalog read failed: {0}")]
    Storage(String),
}

/// Read access to the product catalog.
///
/// The notifier resolves display names through this seam so it never sees
/// the write-side store contract.
pub trait ProductReader: Send + Sync {
    /// Fetch a product by id. `Ok(None)` means the product does not exist.
    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, ReaderError>;
}

impl<R> ProductReader for Arc<R>
where
    R: ProductReader + ?Sized,
{
    fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, ReaderError> {
        (**self).get_product(product_id)
    }
}
