//! Configuration validation.
//!
//! Serde handles syntax; this checks values that parse but cannot work.
//! Returns all validation errors, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ExchangeConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &ExchangeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.provider.enabled {
        if config.provider.rpc_url.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new("provider.rpc_url", "not a valid URL"));
        }
        if config.provider.rpc_timeout_secs == 0 {
            errors.push(ValidationError::new("provider.rpc_timeout_secs", "must be > 0"));
        }
    }

    let contracts = &config.contracts;
    for (field, address) in [
        ("contracts.external_token", contracts.external_token),
        ("contracts.internal_token", contracts.internal_token),
        ("contracts.exchange", contracts.exchange),
    ] {
        if address.is_zero() {
            errors.push(ValidationError::new(field, "zero address"));
        }
    }
    if !contracts.external_token.is_zero() && contracts.external_token == contracts.internal_token {
        errors.push(ValidationError::new(
            "contracts.internal_token",
            "must differ from contracts.external_token",
        ));
    }

    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new("confirmation.poll_interval_ms", "must be > 0"));
    }
    if config.confirmation.max_attempts == 0 {
        errors.push(ValidationError::new("confirmation.max_attempts", "must be > 0"));
    }

    if config.tokens.external_display_decimals > 18 || config.tokens.internal_display_decimals > 18 {
        errors.push(ValidationError::new("tokens", "display decimals exceed 18"));
    }

    if config.api.enabled && config.api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("api.bind_address", "not a socket address"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
