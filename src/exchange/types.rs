//! Exchange engine types.

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::blockchain::ChainId;
use crate::contracts::GatewayError;
use crate::error::ErrorKind;
use crate::exchange::amount::TokenAmount;
use crate::session::{Session, SessionError};

/// The two tokens the exchange contract swaps between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Platform-external token.
    External,
    /// Platform-internal utility token.
    Internal,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::External => "external",
            TokenKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    ExternalToInternal,
    InternalToExternal,
}

impl Direction {
    /// Token the user spends (and approves).
    pub fn input_token(&self) -> TokenKind {
        match self {
            Direction::ExternalToInternal => TokenKind::External,
            Direction::InternalToExternal => TokenKind::Internal,
        }
    }

    pub fn output_token(&self) -> TokenKind {
        match self {
            Direction::ExternalToInternal => TokenKind::Internal,
            Direction::InternalToExternal => TokenKind::External,
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            Direction::ExternalToInternal => Direction::InternalToExternal,
            Direction::InternalToExternal => Direction::ExternalToInternal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ExternalToInternal => "external_to_internal",
            Direction::InternalToExternal => "internal_to_external",
        }
    }
}

/// Engine / transaction phase.
///
/// ```text
/// Idle → Quoting → Approving → Approved → Swapping → Confirmed
///                      └──────────┴──────────┴──→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Quoting,
    Approving,
    Approved,
    Swapping,
    Confirmed,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Quoting => "quoting",
            Phase::Approving => "approving",
            Phase::Approved => "approved",
            Phase::Swapping => "swapping",
            Phase::Confirmed => "confirmed",
            Phase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why and where an exchange stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    /// Phase the transaction was in when it failed.
    pub phase: Phase,
    pub message: String,
    /// True when the engine failed the exchange on its own initiative.
    pub engine_initiated: bool,
}

impl Failure {
    pub fn from_error(error: &ExchangeError, phase: Phase) -> Self {
        let kind = error.kind();
        Self {
            kind,
            phase,
            message: error.to_string(),
            engine_initiated: kind.is_engine_initiated(),
        }
    }
}

/// One exchange attempt, from execute to Confirmed or Failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    pub id: Uuid,
    pub account: Option<Address>,
    pub chain_id: Option<ChainId>,
    pub direction: Direction,
    pub input_amount: TokenAmount,
    /// Advisory output computed from the fixed rate.
    pub expected_output: TokenAmount,
    pub phase: Phase,
    pub tx_hash_approve: Option<TxHash>,
    pub tx_hash_swap: Option<TxHash>,
    pub failure: Option<Failure>,
    /// Unix seconds.
    pub started_at: u64,
    pub finished_at: Option<u64>,
}

impl ExchangeTransaction {
    pub fn new(
        session: &Session,
        direction: Direction,
        input_amount: TokenAmount,
        expected_output: TokenAmount,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: session.account(),
            chain_id: session.chain_id(),
            direction,
            input_amount,
            expected_output,
            phase: Phase::Quoting,
            tx_hash_approve: None,
            tx_hash_swap: None,
            failure: None,
            started_at: unix_now(),
            finished_at: None,
        }
    }

    pub(crate) fn confirm(&mut self) {
        self.phase = Phase::Confirmed;
        self.finished_at = Some(unix_now());
    }

    pub(crate) fn fail(&mut self, failure: Failure) {
        self.phase = Phase::Failed;
        self.failure = Some(failure);
        self.finished_at = Some(unix_now());
    }
}

/// Errors returned by engine commands.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("Insufficient {token} balance: need {requested}, have {available}")]
    InsufficientBalance {
        token: TokenKind,
        requested: TokenAmount,
        available: TokenAmount,
    },

    #[error("An exchange is already in flight")]
    InFlight,

    #[error("{phase} failed: {source}")]
    Gateway {
        phase: Phase,
        #[source]
        source: GatewayError,
    },

    #[error("Session changed mid-exchange: {reason}")]
    SessionInvalidated { reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExchangeError::NotConnected => ErrorKind::NotConnected,
            ExchangeError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            ExchangeError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            ExchangeError::InFlight => ErrorKind::ExchangeInFlight,
            ExchangeError::Gateway { source, .. } => source.kind(),
            ExchangeError::SessionInvalidated { .. } => ErrorKind::SessionInvalidated,
            ExchangeError::Session(e) => e.kind(),
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_tokens() {
        let d = Direction::ExternalToInternal;
        assert_eq!(d.input_token(), TokenKind::External);
        assert_eq!(d.output_token(), TokenKind::Internal);
        assert_eq!(d.reversed().input_token(), TokenKind::Internal);
        assert_eq!(d.reversed().reversed(), d);
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(Phase::Approved.to_string(), "approved");
        assert_eq!(serde_json::to_string(&Phase::Swapping).unwrap(), "\"swapping\"");
    }

    #[test]
    fn test_error_kinds() {
        let err = ExchangeError::InsufficientBalance {
            token: TokenKind::External,
            requested: TokenAmount::parse("2").unwrap(),
            available: TokenAmount::parse("1.5").unwrap(),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(err.to_string(), "Insufficient external balance: need 2, have 1.5");

        let err = ExchangeError::SessionInvalidated {
            reason: "account changed".into(),
        };
        let failure = Failure::from_error(&err, Phase::Approving);
        assert!(failure.engine_initiated);
        assert_eq!(failure.phase, Phase::Approving);
    }

    #[test]
    fn test_direction_serde() {
        let json = serde_json::to_string(&Direction::InternalToExternal).unwrap();
        assert_eq!(json, "\"internal_to_external\"");
    }
}
