//! Gateway errors and confirmation policy.

use alloy::primitives::TxHash;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfirmationConfig;
use crate::error::ErrorKind;

/// Errors raised by the contract gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Balance read failed on the network path.
    #[error("Failed to read {token} balance: {reason}")]
    Read { token: &'static str, reason: String },

    /// Signing was rejected or the node refused the transaction.
    #[error("{op} submission failed: {reason}")]
    Submit { op: &'static str, reason: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },

    #[error("Transaction {tx_hash} not confirmed after {attempts} receipt polls")]
    Timeout { tx_hash: TxHash, attempts: u32 },
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Read { .. } => ErrorKind::ReadError,
            GatewayError::Submit { .. } => ErrorKind::SubmitError,
            GatewayError::Reverted { .. } => ErrorKind::RevertedError,
            GatewayError::Timeout { .. } => ErrorKind::TimeoutError,
        }
    }

    /// Hash of the transaction the error is about, when one was submitted.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            GatewayError::Reverted { tx_hash } | GatewayError::Timeout { tx_hash, .. } => {
                Some(*tx_hash)
            }
            _ => None,
        }
    }
}

/// How long to wait for a submitted transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl From<&ConfirmationConfig> for ConfirmationPolicy {
    fn from(config: &ConfirmationConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::from(&ConfirmationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config() {
        let policy = ConfirmationPolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_secs(2));
        assert_eq!(policy.max_attempts, 90);

        let policy = ConfirmationPolicy::from(&ConfirmationConfig {
            max_attempts: 0,
            ..ConfirmationConfig::default()
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_error_kinds() {
        let err = GatewayError::Timeout {
            tx_hash: TxHash::ZERO,
            attempts: 3,
        };
        assert_eq!(err.kind(), ErrorKind::TimeoutError);
        assert_eq!(err.tx_hash(), Some(TxHash::ZERO));

        let err = GatewayError::Submit {
            op: "approve",
            reason: "user denied".into(),
        };
        assert_eq!(err.kind(), ErrorKind::SubmitError);
        assert_eq!(err.tx_hash(), None);
        assert_eq!(err.to_string(), "approve submission failed: user denied");
    }
}
