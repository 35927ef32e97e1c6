//! Shutdown fan-out for the daemon's background tasks.

use tokio::sync::broadcast;

/// One trigger, many listeners.
///
/// The network watcher, balance sync, engine event loop and API server each
/// hold a receiver and leave their loop when it fires.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Receivers created afterwards never see it.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::BalanceSynchronizer;
    use crate::contracts::{ConfirmationPolicy, ContractGateway};
    use crate::config::ContractsConfig;
    use crate::session::ProviderSession;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_trigger_stops_balance_sync_loop() {
        let session = ProviderSession::new(None);
        let gateway = ContractGateway::new(
            None,
            ContractsConfig::default(),
            ConfirmationPolicy::default(),
        );
        let balances = BalanceSynchronizer::new(session.clone(), gateway);

        let shutdown = Shutdown::new();
        let task = tokio::spawn(balances.run(session.subscribe(), shutdown.subscribe()));
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop exits on shutdown")
            .unwrap();
    }
}
