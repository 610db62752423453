//! Mail transport seam.
//!
//! The contract is `send(to, subject, body) → success | failure`; the SMTP
//! implementation is the production transport, the recording one backs
//! tests.

use std::sync::Mutex;
use std::time::Duration;

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use stockpile_core::EmailAddress;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(String),

    #[error("smtp failure: {0}")]
    Smtp(String),
}

/// Black-box mail delivery.
pub trait MailTransport: Send + Sync {
    fn send(&self, to: &EmailAddress, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP mailer (lettre).
///
/// STARTTLS on the submission port by default; credentials are optional so
/// the local dev relay (mailhog-style, no auth) works unchanged.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: &str,
        use_tls: bool,
    ) -> Result<Self, MailError> {
        let mut builder = if use_tls {
            SmtpTransport::starttls_relay(host).map_err(|e| MailError::Smtp(e.to_string()))?
        } else {
            SmtpTransport::builder_dangerous(host)
        };
        builder = builder.port(port).timeout(Some(Duration::from_secs(20)));
        if !username.is_empty() {
            builder =
                builder.credentials(Credentials::new(username.to_string(), password.to_string()));
        }

        let from = from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("from: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, to: &EmailAddress, subject: &str, body: &str) -> Result<(), MailError> {
        let to = to
            .as_str()
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(format!("to: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        self.transport
            .send(&message)
            .map_err(|e| MailError::Smtp(e.to_string()))?;
        Ok(())
    }
}

/// A sent email, as captured by [`RecordingMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records emails instead of delivering them (tests/dev).
///
/// Can be told to fail so transport-failure paths are testable.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl MailTransport for RecordingMailer {
    fn send(&self, to: &EmailAddress, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Smtp("simulated transport failure".to_string()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
