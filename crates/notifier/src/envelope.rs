//! Decoding of the order-event envelope.
//!
//! The envelope carries a generic typed field map
//! (`{"fields": {<name>: {"stringValue": <value>}}}`) so the notifier can
//! parse it without sharing types with the forwarder.

use serde_json::Value as JsonValue;

use crate::handler::NotifyError;

/// The two fields an order event must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeFields {
    pub buyer_email: String,
    pub product_id: String,
}

impl EnvelopeFields {
    /// Extract the required fields from a raw envelope.
    ///
    /// A missing or non-string field is a terminal validation error; no
    /// email may be sent for such an event.
    pub fn from_envelope(envelope: &JsonValue) -> Result<Self, NotifyError> {
        let fields = envelope.pointer("/value/fields");

        let buyer_email = fields
            .and_then(|f| get_string(f, "buyer_email"))
            .ok_or(NotifyError::MissingField { field: "buyer_email" })?;
        let product_id = fields
            .and_then(|f| get_string(f, "product_id"))
            .ok_or(NotifyError::MissingField { field: "product_id" })?;

        Ok(Self {
            buyer_email,
            product_id,
        })
    }
}

fn get_string(fields: &JsonValue, name: &str) -> Option<String> {
    let value = fields.get(name)?.get("stringValue")?.as_str()?;
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(fields: JsonValue) -> JsonValue {
        json!({ "value": { "name": "journals/shop/orders/o-1", "fields": fields } })
    }

    #[test]
    fn extracts_both_fields() {
        let env = envelope(json!({
            "buyer_email": { "stringValue": "a@example.com" },
            "product_id": { "stringValue": "p1" },
        }));

        let fields = EnvelopeFields::from_envelope(&env).unwrap();
        assert_eq!(fields.buyer_email, "a@example.com");
        assert_eq!(fields.product_id, "p1");
    }

    #[test]
    fn missing_buyer_email_is_a_validation_error() {
        let env = envelope(json!({
            "product_id": { "stringValue": "p1" },
        }));

        let err = EnvelopeFields::from_envelope(&env).unwrap_err();
        assert!(matches!(err, NotifyError::MissingField { field: "buyer_email" }));
    }

    #[test]
    fn missing_product_id_is_a_validation_error() {
        let env = envelope(json!({
            "buyer_email": { "stringValue": "a@example.com" },
        }));

        let err = EnvelopeFields::from_envelope(&env).unwrap_err();
        assert!(matches!(err, NotifyError::MissingField { field: "product_id" }));
    }

    #[test]
    fn untyped_or_empty_fields_count_as_missing() {
        let env = envelope(json!({
            "buyer_email": "a@example.com",
            "product_id": { "stringValue": "" },
        }));

        let err = EnvelopeFields::from_envelope(&env).unwrap_err();
        assert!(matches!(err, NotifyError::MissingField { .. }));
    }

    #[test]
    fn empty_envelope_is_a_validation_error() {
        let err = EnvelopeFields::from_envelope(&json!({})).unwrap_err();
        assert!(matches!(err, NotifyError::MissingField { field: "buyer_email" }));
    }
}
