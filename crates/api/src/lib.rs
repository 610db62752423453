//! Order-placement HTTP service.
//!
//! Thin routing over the stock ledger: the caller arrives already
//! authenticated (identity/credential handling lives outside this
//! service), places an order, and learns synchronously whether it
//! succeeded. Confirmation email is best-effort downstream and never
//! reported back through this surface.

pub mod app;
pub mod config;
pub mod errors;

pub use app::{AppState, build_router};
pub use config::{ApiConfig, ConfigError};
