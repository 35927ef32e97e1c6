//! JSON-RPC signing provider backed by a local key.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint with a wallet filler
//! - Query chain state (chain id, balances, receipts, read-only calls)
//! - Sign and broadcast transactions
//! - Handle timeouts and network errors gracefully
//! - Publish network changes observed by polling the chain id

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::provider::SigningProvider;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, ProviderConfig, ProviderNotification, TxReceipt,
};
use crate::blockchain::wallet::Wallet;

const NOTIFICATION_CAPACITY: usize = 16;

/// Signing provider that talks to a node over HTTP and signs locally.
pub struct RpcSigningProvider {
    provider: DynProvider,
    wallet: Wallet,
    config: ProviderConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
    notifications: broadcast::Sender<ProviderNotification>,
}

impl RpcSigningProvider {
    /// Create a provider for `config.rpc_url` signing with `wallet`.
    ///
    /// No request is made here; an unreachable node surfaces on first use.
    pub fn new(config: ProviderConfig, wallet: Wallet) -> BlockchainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let provider = ProviderBuilder::new()
            .wallet(wallet.ethereum_wallet())
            .connect_http(url)
            .erased();

        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            account = %wallet.address(),
            "RPC signing provider initialized"
        );

        Ok(Self {
            provider,
            wallet,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            config,
            notifications,
        })
    }

    async fn bounded<T, E, F>(&self, op: &'static str, fut: F) -> BlockchainResult<T>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::warn!(op, error = %e, "RPC error");
                Err(BlockchainError::Rpc(format!("{}: {}", op, e)))
            }
            Err(_) => {
                tracing::warn!(op, "RPC timeout");
                Err(BlockchainError::Timeout(self.config.rpc_timeout_secs))
            }
        }
    }

    /// Poll the node's chain id and publish `ChainChanged` when it moves.
    ///
    /// Runs until `shutdown` fires. A zero interval disables the watcher.
    pub async fn watch_network(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if self.config.network_poll_secs == 0 {
            tracing::info!("Network watcher disabled");
            return;
        }

        let mut ticker = interval(Duration::from_secs(self.config.network_poll_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<ChainId> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.chain_id().await {
                        Ok(current) => {
                            if let Some(previous) = last_seen {
                                if previous != current {
                                    tracing::info!(%previous, %current, "Network change detected");
                                    let _ = self.notifications.send(ProviderNotification::ChainChanged(current.0));
                                }
                            }
                            last_seen = Some(current);
                        }
                        Err(e) => tracing::debug!(error = %e, "Network probe failed"),
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Network watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl SigningProvider for RpcSigningProvider {
    async fn request_accounts(&self) -> BlockchainResult<Vec<Address>> {
        // A local key is authorized by virtue of being loaded.
        tracing::debug!(account = %self.wallet.address(), "Account access granted");
        Ok(vec![self.wallet.address()])
    }

    async fn accounts(&self) -> BlockchainResult<Vec<Address>> {
        Ok(vec![self.wallet.address()])
    }

    async fn chain_id(&self) -> BlockchainResult<ChainId> {
        self.bounded("eth_chainId", async { self.provider.get_chain_id().await })
            .await
            .map(ChainId)
    }

    async fn native_balance(&self, account: Address) -> BlockchainResult<U256> {
        self.bounded("eth_getBalance", async { self.provider.get_balance(account).await })
            .await
    }

    async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.bounded("eth_call", async { self.provider.call(tx).await }).await
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> BlockchainResult<TxHash> {
        let pending = self
            .bounded("eth_sendTransaction", async {
                self.provider.send_transaction(tx).await
            })
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TxReceipt>> {
        let receipt = self
            .bounded("eth_getTransactionReceipt", async {
                self.provider.get_transaction_receipt(tx_hash).await
            })
            .await?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash,
            block_number: r.block_number,
            success: ReceiptResponse::status(&r),
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderNotification> {
        self.notifications.subscribe()
    }
}

impl std::fmt::Debug for RpcSigningProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSigningProvider")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("account", &self.wallet.address())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
