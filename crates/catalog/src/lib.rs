//! Product catalog domain: stocked products and read access to them.

pub mod product;
pub mod reader;

pub use product::{Product, StockStatus};
pub use reader::{ProductReader, ReaderError};
