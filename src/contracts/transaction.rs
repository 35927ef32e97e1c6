//! Confirmation monitoring for submitted transactions.

use alloy::primitives::TxHash;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};

use crate::blockchain::{SigningProvider, TxReceipt};
use crate::contracts::types::{ConfirmationPolicy, GatewayError};
use crate::observability::metrics;

/// A submitted transaction that can be awaited until mined.
pub struct TransactionHandle {
    provider: Arc<dyn SigningProvider>,
    tx_hash: TxHash,
    policy: ConfirmationPolicy,
    op: &'static str,
}

impl TransactionHandle {
    pub(crate) fn new(
        provider: Arc<dyn SigningProvider>,
        tx_hash: TxHash,
        policy: ConfirmationPolicy,
        op: &'static str,
    ) -> Self {
        Self {
            provider,
            tx_hash,
            policy,
            op,
        }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Poll for the receipt until it is mined or the policy is exhausted.
    ///
    /// Receipt read failures count as attempts. Nothing is resubmitted.
    pub async fn await_confirmation(&self) -> Result<TxReceipt, GatewayError> {
        let started = Instant::now();
        let mut ticker = interval(self.policy.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=self.policy.max_attempts {
            ticker.tick().await;

            match self.provider.transaction_receipt(self.tx_hash).await {
                Ok(Some(receipt)) => {
                    metrics::record_confirmation_wait(started.elapsed());
                    metrics::record_gateway_call(self.op, receipt.success);
                    if !receipt.success {
                        tracing::warn!(op = self.op, tx_hash = %self.tx_hash, "Transaction reverted");
                        return Err(GatewayError::Reverted {
                            tx_hash: self.tx_hash,
                        });
                    }
                    tracing::info!(
                        op = self.op,
                        tx_hash = %self.tx_hash,
                        block = ?receipt.block_number,
                        attempt,
                        "Transaction confirmed"
                    );
                    return Ok(receipt);
                }
                Ok(None) => {
                    tracing::debug!(op = self.op, tx_hash = %self.tx_hash, attempt, "Transaction pending");
                }
                Err(e) => {
                    tracing::debug!(op = self.op, tx_hash = %self.tx_hash, attempt, error = %e, "Receipt poll failed");
                }
            }
        }

        metrics::record_gateway_call(self.op, false);
        tracing::warn!(
            op = self.op,
            tx_hash = %self.tx_hash,
            attempts = self.policy.max_attempts,
            "Gave up waiting for confirmation"
        );
        Err(GatewayError::Timeout {
            tx_hash: self.tx_hash,
            attempts: self.policy.max_attempts,
        })
    }
}

impl std::fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("op", &self.op)
            .field("tx_hash", &self.tx_hash)
            .finish()
    }
}
