//! Cached balances for the active account.

use alloy::primitives::Address;
use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::blockchain::ChainId;
use crate::contracts::{ContractGateway, GatewayError};
use crate::exchange::amount::TokenAmount;
use crate::exchange::types::{unix_now, TokenKind};
use crate::observability::metrics;
use crate::session::{ProviderSession, SessionEvent};

/// Balances of one account as last read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub account: Address,
    pub chain_id: Option<ChainId>,
    pub external: TokenAmount,
    pub internal: TokenAmount,
    /// Native coin balance, when it could be read.
    pub native: Option<TokenAmount>,
    /// Tokens whose last read failed; their value is carried over.
    pub stale: Vec<TokenKind>,
    /// Unix seconds.
    pub as_of: u64,
    /// Order in which the refresh producing this snapshot started.
    #[serde(skip)]
    sequence: u64,
}

impl BalanceSnapshot {
    pub fn balance(&self, token: TokenKind) -> TokenAmount {
        match token {
            TokenKind::External => self.external,
            TokenKind::Internal => self.internal,
        }
    }
}

/// Keeps the [`BalanceSnapshot`] in step with session changes and
/// completed exchanges.
///
/// There is no timer; refreshes happen only on connect, account or network
/// change, and after a confirmed exchange.
#[derive(Clone)]
pub struct BalanceSynchronizer {
    session: ProviderSession,
    gateway: ContractGateway,
    snapshot: Arc<ArcSwapOption<BalanceSnapshot>>,
    refreshes: Arc<AtomicU64>,
    started: Arc<AtomicU64>,
}

impl BalanceSynchronizer {
    pub fn new(session: ProviderSession, gateway: ContractGateway) -> Self {
        Self {
            session,
            gateway,
            snapshot: Arc::new(ArcSwapOption::empty()),
            refreshes: Arc::new(AtomicU64::new(0)),
            started: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read both token balances (and the native balance) concurrently.
    ///
    /// Each read fails independently: a failed token keeps its previous value
    /// for the same account and network, or zero, and is listed in `stale`.
    ///
    /// The snapshot carries the network the reads started on. It is only
    /// cached if that account and network are still active and no refresh
    /// that started later has been cached already.
    pub async fn refresh(&self, account: Address) -> BalanceSnapshot {
        let chain_id = self.session.current_session().chain_id();
        let sequence = self.started.fetch_add(1, Ordering::SeqCst) + 1;

        let (external, internal, native) = tokio::join!(
            self.gateway.balance_of(TokenKind::External, account),
            self.gateway.balance_of(TokenKind::Internal, account),
            self.gateway.native_balance(account),
        );

        let previous = self
            .snapshot_for(account)
            .filter(|s| s.chain_id == chain_id);
        let mut stale = Vec::new();
        let mut settle = |token: TokenKind, read: Result<TokenAmount, GatewayError>| match read {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!(%account, %token, error = %e, "Balance read failed, keeping previous value");
                stale.push(token);
                previous
                    .as_ref()
                    .map(|p| p.balance(token))
                    .unwrap_or(TokenAmount::ZERO)
            }
        };
        let external = settle(TokenKind::External, external);
        let internal = settle(TokenKind::Internal, internal);
        let native = match native {
            Ok(amount) => Some(amount),
            Err(e) => {
                tracing::debug!(%account, error = %e, "Native balance read failed");
                previous.as_ref().and_then(|p| p.native)
            }
        };

        let snapshot = BalanceSnapshot {
            account,
            chain_id,
            external,
            internal,
            native,
            stale,
            as_of: unix_now(),
            sequence,
        };

        let session = self.session.current_session();
        if session.account() != Some(account) || session.chain_id() != chain_id {
            tracing::debug!(%account, "Session moved on during refresh, dropping balance snapshot");
        } else {
            let fresh = Arc::new(snapshot.clone());
            let mut superseded = false;
            self.snapshot.rcu(|stored| match stored {
                Some(stored)
                    if stored.account == account
                        && stored.chain_id == chain_id
                        && stored.sequence > sequence =>
                {
                    superseded = true;
                    Some(Arc::clone(stored))
                }
                _ => {
                    superseded = false;
                    Some(Arc::clone(&fresh))
                }
            });
            if superseded {
                tracing::debug!(%account, "Newer balances already cached, dropping snapshot");
            } else {
                tracing::debug!(
                    %account,
                    external = %snapshot.external,
                    internal = %snapshot.internal,
                    "Balances refreshed"
                );
            }
        }

        self.refreshes.fetch_add(1, Ordering::Relaxed);
        metrics::record_balance_refresh();
        snapshot
    }

    /// Latest snapshot, whichever account it belongs to.
    pub fn snapshot(&self) -> Option<Arc<BalanceSnapshot>> {
        self.snapshot.load_full()
    }

    /// Latest snapshot if it belongs to `account`.
    pub fn snapshot_for(&self, account: Address) -> Option<Arc<BalanceSnapshot>> {
        self.snapshot().filter(|s| s.account == account)
    }

    pub fn clear(&self) {
        self.snapshot.store(None);
    }

    /// Number of refreshes performed since start.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub async fn handle_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected { account, .. } => {
                self.refresh(*account).await;
            }
            SessionEvent::AccountChanged { current, .. } => {
                self.clear();
                self.refresh(*current).await;
            }
            SessionEvent::NetworkChanged { account, .. } => {
                self.clear();
                self.refresh(*account).await;
            }
            SessionEvent::Disconnected { .. } => self.clear(),
        }
    }

    /// Follow session events until shutdown.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<SessionEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => self.handle_event(&event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Balance sync lagged behind session events");
                        match self.session.current_session().account() {
                            Some(account) => {
                                self.refresh(account).await;
                            }
                            None => self.clear(),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Balance sync received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for BalanceSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceSynchronizer")
            .field("snapshot", &self.snapshot())
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}
