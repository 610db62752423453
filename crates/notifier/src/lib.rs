//! Order confirmation notifier.
//!
//! Triggered with an order-event envelope, it resolves the product's
//! display name from the catalog, composes the confirmation email, and
//! invokes the mail transport. Each invocation is independent: calling it
//! twice for the same order sends two emails (the trigger layer owns
//! redelivery, not this crate).

pub mod config;
pub mod envelope;
pub mod handler;
pub mod http;
pub mod mailer;


pub use config::{ConfigError, NotifierConfig};
pub use envelope::EnvelopeFields;
pub use handler::{NotifyError, notify_order};
pub use mailer::{MailError, MailTransport, RecordingMailer, SmtpMailer};
