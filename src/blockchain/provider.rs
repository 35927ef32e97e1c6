//! The signing capability seam.
//!
//! Everything the client needs from a wallet is behind [`SigningProvider`]:
//! account access, network id, read-only calls, sign-and-submit, receipts,
//! and out-of-band account/network notifications. The session, gateway and
//! synchronizer only ever see `Arc<dyn SigningProvider>`.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::blockchain::types::{BlockchainResult, ChainId, ProviderNotification, TxReceipt};

#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Ask the account holder for access. May prompt.
    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>>;

    /// Accounts already authorized for this client. Never prompts.
    async fn accounts(&self) -> BlockchainResult<Vec<Address>>;

    /// Network the provider is currently pointed at.
    async fn chain_id(&self) -> BlockchainResult<ChainId>;

    /// Native coin balance of `account`.
    async fn native_balance(&self, account: Address) -> BlockchainResult<U256>;

    /// Execute a read-only contract call and return the raw return data.
    async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes>;

    /// Sign and submit a state-changing transaction.
    async fn send_transaction(&self, tx: TransactionRequest) -> BlockchainResult<TxHash>;

    /// Receipt for `tx_hash`, or `None` while it is still pending.
    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TxReceipt>>;

    /// Subscribe to account and network change notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderNotification>;
}
