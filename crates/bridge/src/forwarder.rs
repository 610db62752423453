//! Wire encoding and delivery of order events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value as JsonValue, json};
use thiserror::Error;
use tracing::info;

use stockpile_ledger::OrderRecord;

/// Read-only wire view of an order journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEvent {
    pub order_id: String,
    pub buyer_email: String,
    pub product_id: String,
}

impl OrderEvent {
    pub fn from_record(record: &OrderRecord) -> Self {
        Self {
            order_id: record.order_id().to_string(),
            buyer_email: record.buyer_email().to_string(),
            product_id: record.product_id().to_string(),
        }
    }

    /// Encode into the envelope the notifier expects: every field as a
    /// typed `{"stringValue": ...}` pair, wrapped with the fully-qualified
    /// journal path of the source entry.
    pub fn to_envelope(&self, journal_path: &str) -> JsonValue {
        json!({
            "value": {
                "name": format!("{journal_path}/{}", self.order_id),
                "fields": {
                    "buyer_email": { "stringValue": self.buyer_email },
                    "product_id": { "stringValue": self.product_id },
                },
            }
        })
    }
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("notifier returned status {status}")]
    Status { status: u16 },

    #[error("transport failure: {0}")]
    Transport(String),
}

/// One-way handoff of an order event to the downstream notifier.
///
/// A forwarding failure means the order goes silently unnotified; callers
/// log the outcome and move on. There is no acknowledgment path back into
/// the watcher.
pub trait EventForwarder: Send + Sync {
    fn forward(&self, event: &OrderEvent) -> Result<(), ForwardError>;
}

impl<F> EventForwarder for Arc<F>
where
    F: EventForwarder + ?Sized,
{
    fn forward(&self, event: &OrderEvent) -> Result<(), ForwardError> {
        (**self).forward(event)
    }
}

/// HTTP forwarder: POSTs the envelope to the notifier endpoint.
///
/// The request timeout is enforced at the transport layer so a hanging
/// notifier can never block the watcher loop indefinitely.
#[derive(Debug)]
pub struct HttpEventForwarder {
    client: reqwest::blocking::Client,
    url: String,
    journal_path: String,
}

impl HttpEventForwarder {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(
        url: impl Into<String>,
        journal_path: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForwardError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            journal_path: journal_path.into(),
        })
    }
}

impl EventForwarder for HttpEventForwarder {
    fn forward(&self, event: &OrderEvent) -> Result<(), ForwardError> {
        let envelope = event.to_envelope(&self.journal_path);
        let response = self
            .client
            .post(&self.url)
            .json(&envelope)
            .send()
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        let status = response.status();
        info!(order_id = %event.order_id, status = status.as_u16(), "POST order event");

        if !status.is_success() {
            return Err(ForwardError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Records forwarded events instead of delivering them (tests/dev).
#[derive(Debug, Default)]
pub struct RecordingForwarder {
    inner: Mutex<Vec<OrderEvent>>,
}

impl RecordingForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarded(&self) -> Vec<OrderEvent> {
        self.inner.lock().unwrap().clone()
    }
}

impl EventForwarder for RecordingForwarder {
    fn forward(&self, event: &OrderEvent) -> Result<(), ForwardError> {
        self.inner.lock().unwrap().push(event.clone());
        Ok(())
    }
}
