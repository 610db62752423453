//! Environment-driven configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Notifier service configuration.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub smtp_from: String,
    pub smtp_use_tls: bool,
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8081".to_string()),
            database_url: required("DATABASE_URL")?,
            smtp_host: required("SMTP_HOST")?,
            smtp_port: parse_u16("SMTP_PORT", optional("SMTP_PORT"), 587)?,
            smtp_user: optional("SMTP_USER").unwrap_or_default(),
            smtp_password: optional("SMTP_PASSWORD").unwrap_or_default(),
            smtp_from: required("SMTP_FROM")?,
            smtp_use_tls: parse_bool("SMTP_USE_TLS", optional("SMTP_USE_TLS"), true)?,
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parse_u16(
    name: &'static str,
    value: Option<String>,
    default: u16,
) -> Result<u16, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn parse_bool(
    name: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_defaults_to_submission_port() {
        assert_eq!(parse_u16("SMTP_PORT", None, 587).unwrap(), 587);
        assert_eq!(parse_u16("SMTP_PORT", Some("2525".to_string()), 587).unwrap(), 2525);
        assert!(parse_u16("SMTP_PORT", Some("not-a-port".to_string()), 587).is_err());
    }

    #[test]
    fn tls_flag_accepts_common_spellings() {
        assert!(parse_bool("SMTP_USE_TLS", None, true).unwrap());
        assert!(parse_bool("SMTP_USE_TLS", Some("TRUE".to_string()), false).unwrap());
        assert!(!parse_bool("SMTP_USE_TLS", Some("0".to_string()), true).unwrap());
        assert!(parse_bool("SMTP_USE_TLS", Some("maybe".to_string()), true).is_err());
    }
}
