//! The notification pipeline: decode, resolve, compose, send.

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use stockpile_catalog::ProductReader;
use stockpile_core::{EmailAddress, ProductId};

use crate::envelope::EnvelopeFields;
use crate::mailer::{MailError, MailTransport};

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The envelope is unusable; terminal, no email sent, no retry.
    #[error("missing {field} in order event")]
    MissingField { field: &'static str },

    /// A field was present but malformed; terminal as above.
    #[error("invalid field in order event: {0}")]
    InvalidField(String),

    /// The ordered product no longer resolves; terminal, no email sent.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("catalog lookup failed: {0}")]
    Catalog(String),

    /// Transport failure. Surfaced to the trigger layer so its redelivery
    /// (if any) can re-invoke the notifier.
    #[error("failed to send confirmation email to {to}")]
    Mail {
        to: String,
        #[source]
        source: MailError,
    },
}

/// Process one order event end to end.
pub fn notify_order(
    envelope: &JsonValue,
    catalog: &dyn ProductReader,
    mailer: &dyn MailTransport,
) -> Result<(), NotifyError> {
    let fields = EnvelopeFields::from_envelope(envelope)?;

    let buyer_email = EmailAddress::parse(&fields.buyer_email)
        .map_err(|e| NotifyError::InvalidField(e.to_string()))?;
    let product_id = ProductId::new(&fields.product_id)
        .map_err(|e| NotifyError::InvalidField(e.to_string()))?;

    let product = catalog
        .get_product(&product_id)
        .map_err(|e| NotifyError::Catalog(e.to_string()))?
        .ok_or_else(|| NotifyError::ProductNotFound(product_id.to_string()))?;

    let product_name = product.product_name();
    let subject = format!("New order for product {product_name}");
    let body = format!(
        "Your order was confirmed for product: {product_name}\nProduct ID: {product_id}"
    );

    mailer
        .send(&buyer_email, &subject, &body)
        .map_err(|source| NotifyError::Mail {
            to: buyer_email.to_string(),
            source,
        })?;

    info!(to = %buyer_email, product_id = %product_id, "confirmation email sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use stockpile_catalog::Product;
    use stockpile_ledger::{InMemoryStockStore, StockStore};

    use crate::mailer::RecordingMailer;

    use super::*;

    fn catalog_with_widget() -> InMemoryStockStore {
        let store = InMemoryStockStore::new();
        store
            .upsert_product(
                Product::new(ProductId::new("p1").unwrap(), "Red Widget", 3).unwrap(),
            )
            .unwrap();
        store
    }

    fn order_envelope(email: &str, product_id: &str) -> JsonValue {
        json!({
            "value": {
                "name": "journals/shop/orders/o-1",
                "fields": {
                    "buyer_email": { "stringValue": email },
                    "product_id": { "stringValue": product_id },
                },
            }
        })
    }

    #[test]
    fn sends_confirmation_with_display_name_and_id() {
        let catalog = catalog_with_widget();
        let mailer = RecordingMailer::new();

        notify_order(
            &order_envelope("buyer@example.com", "p1"),
            &catalog,
            &mailer,
        )
        .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@example.com");
        assert_eq!(sent[0].subject, "New order for product Red Widget");
        assert_eq!(
            sent[0].body,
            "Your order was confirmed for product: Red Widget\nProduct ID: p1"
        );
    }

    #[test]
    fn incomplete_envelope_never_reaches_the_mail_transport() {
        let catalog = catalog_with_widget();
        let mailer = RecordingMailer::new();

        let missing_email = json!({
            "value": { "fields": { "product_id": { "stringValue": "p1" } } }
        });
        let err = notify_order(&missing_email, &catalog, &mailer).unwrap_err();
        assert!(matches!(err, NotifyError::MissingField { field: "buyer_email" }));

        let missing_product = json!({
            "value": { "fields": { "buyer_email": { "stringValue": "a@example.com" } } }
        });
        let err = notify_order(&missing_product, &catalog, &mailer).unwrap_err();
        assert!(matches!(err, NotifyError::MissingField { field: "product_id" }));

        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn unknown_product_is_terminal_and_sends_nothing() {
        let catalog = catalog_with_widget();
        let mailer = RecordingMailer::new();

        let err = notify_order(
            &order_envelope("buyer@example.com", "ghost"),
            &catalog,
            &mailer,
        )
        .unwrap_err();

        assert!(matches!(err, NotifyError::ProductNotFound(_)));
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn malformed_email_is_a_validation_error() {
        let catalog = catalog_with_widget();
        let mailer = RecordingMailer::new();

        let err = notify_order(&order_envelope("not-an-email", "p1"), &catalog, &mailer)
            .unwrap_err();

        assert!(matches!(err, NotifyError::InvalidField(_)));
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn transport_failure_surfaces_as_mail_error() {
        let catalog = catalog_with_widget();
        let mailer = RecordingMailer::failing();

        let err = notify_order(
            &order_envelope("buyer@example.com", "p1"),
            &catalog,
            &mailer,
        )
        .unwrap_err();

        assert!(matches!(err, NotifyError::Mail { .. }));
    }
}
