//! Error kinds surfaced at the presentation boundary.
//!
//! Each subsystem owns its own `thiserror` enum (`BlockchainError`,
//! `SessionError`, `GatewayError`, `ExchangeError`); all of them collapse into
//! one [`ErrorKind`] so a UI can branch on a stable identifier.

use serde::{Deserialize, Serialize};

/// Stable error identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoProviderAvailable,
    UserRejected,
    ConnectFailed,
    ReadError,
    SubmitError,
    RevertedError,
    TimeoutError,
    InvalidAmount,
    InsufficientBalance,
    NotConnected,
    SessionInvalidated,
    /// A second execute was issued while one is still running.
    ExchangeInFlight,
}

impl ErrorKind {
    /// Raised by the engine itself rather than in response to a user command.
    pub fn is_engine_initiated(&self) -> bool {
        matches!(self, ErrorKind::SessionInvalidated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoProviderAvailable => "no_provider_available",
            ErrorKind::UserRejected => "user_rejected",
            ErrorKind::ConnectFailed => "connect_failed",
            ErrorKind::ReadError => "read_error",
            ErrorKind::SubmitError => "submit_error",
            ErrorKind::RevertedError => "reverted_error",
            ErrorKind::TimeoutError => "timeout_error",
            ErrorKind::InvalidAmount => "invalid_amount",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::NotConnected => "not_connected",
            ErrorKind::SessionInvalidated => "session_invalidated",
            ErrorKind::ExchangeInFlight => "exchange_in_flight",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
