//! Environment-driven configuration.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Order-placement service configuration.
///
/// `database_url` is optional: absent means the in-memory store (dev/test
/// single-process mode).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub notifier_url: String,
    pub journal_path: String,
    pub poll_interval: Duration,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let poll_interval_ms = match optional("POLL_INTERVAL_MS") {
            None => 1000,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "POLL_INTERVAL_MS",
                value: raw,
            })?,
        };

        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: optional("DATABASE_URL"),
            notifier_url: optional("NOTIFIER_URL")
                .unwrap_or_else(|| "http://localhost:8081/".to_string()),
            journal_path: optional("JOURNAL_PATH")
                .unwrap_or_else(|| "journals/shop/orders".to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
