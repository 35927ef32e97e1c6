//! Structured logging.
//!
//! Uses the `tracing` crate for structured events; the subscriber is a
//! registry with an `EnvFilter` (RUST_LOG wins over the configured level) and
//! the fmt layer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter: `RUST_LOG` if set, otherwise the configured level for
/// this crate and `tower_http`.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = config.log_level.as_str();
        if level.contains('=') {
            level.into()
        } else {
            format!("token_exchange={level},tower_http={level}").into()
        }
    })
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &ObservabilityConfig) {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
