//! Provider session: connection lifecycle over a [`SigningProvider`].

use alloy::primitives::Address;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::blockchain::{BlockchainError, ChainId, ProviderNotification, SigningProvider};
use crate::observability::metrics;
use crate::session::types::{Session, SessionError, SessionEvent};

const EVENT_CAPACITY: usize = 32;

/// Owns the [`Session`] value and publishes [`SessionEvent`]s.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProviderSession {
    provider: Option<Arc<dyn SigningProvider>>,
    session: Arc<ArcSwap<Session>>,
    events: broadcast::Sender<SessionEvent>,
    listening: Arc<AtomicBool>,
    /// Serializes state transitions. Never held across an await.
    transition: Arc<Mutex<()>>,
}

impl ProviderSession {
    /// `provider` is `None` when the environment has no signing capability.
    pub fn new(provider: Option<Arc<dyn SigningProvider>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            session: Arc::new(ArcSwap::from_pointee(Session::disconnected())),
            events,
            listening: Arc::new(AtomicBool::new(false)),
            transition: Arc::new(Mutex::new(())),
        }
    }

    /// Current session. Never blocks.
    pub fn current_session(&self) -> Session {
        Session::clone(&self.session.load())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Request account access and connect.
    pub async fn connect(&self) -> Result<Session, SessionError> {
        let Some(provider) = self.provider.clone() else {
            tracing::warn!("Connect requested but no signing provider is available");
            return Err(SessionError::NoProviderAvailable);
        };

        let previous = self.current_session();
        self.session.store(Arc::new(Session::connecting()));

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(BlockchainError::Rejected(reason)) => {
                return Err(self.fail(&previous, SessionError::UserRejected(reason)))
            }
            Err(e) => return Err(self.fail(&previous, SessionError::ConnectFailed(e.to_string()))),
        };
        let Some(&account) = accounts.first() else {
            return Err(self.fail(
                &previous,
                SessionError::ConnectFailed("provider returned no accounts".to_string()),
            ));
        };

        let chain_id = match provider.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(e) => return Err(self.fail(&previous, SessionError::ConnectFailed(e.to_string()))),
        };

        Ok(self.establish(&provider, &previous, account, chain_id))
    }

    /// Silent reconnect on startup.
    ///
    /// Only uses accounts the provider already authorized; never prompts and
    /// never reports an error.
    pub async fn try_resume(&self) -> Option<Session> {
        let provider = self.provider.clone()?;
        let previous = self.current_session();
        if previous.is_connected() {
            return Some(previous);
        }

        let account = match provider.accounts().await {
            Ok(accounts) => *accounts.first()?,
            Err(e) => {
                tracing::debug!(error = %e, "Silent reconnect probe failed");
                return None;
            }
        };
        let chain_id = match provider.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(e) => {
                tracing::debug!(error = %e, "Silent reconnect could not read network");
                return None;
            }
        };

        tracing::info!(%account, %chain_id, "Resumed previously authorized session");
        Some(self.establish(&provider, &previous, account, chain_id))
    }

    /// Drop the session.
    pub fn disconnect(&self) {
        let _guard = self.lock();
        let previous = self.session.swap(Arc::new(Session::disconnected()));
        if previous.is_connected() {
            self.emit(SessionEvent::Disconnected {
                previous: previous.account(),
            });
        }
    }

    /// React to the provider's authorized account list changing.
    pub fn on_accounts_changed(&self, accounts: &[Address]) {
        let _guard = self.lock();
        let current = self.session.load_full();
        let Some(previous) = current.account() else {
            tracing::debug!("Accounts changed while not connected, ignoring");
            return;
        };

        match accounts.first() {
            None => {
                self.session.store(Arc::new(Session::disconnected()));
                self.emit(SessionEvent::Disconnected {
                    previous: Some(previous),
                });
            }
            Some(&next) if next != previous => {
                self.session.store(Arc::new(current.with_account(next)));
                self.emit(SessionEvent::AccountChanged {
                    previous,
                    current: next,
                });
            }
            Some(_) => {}
        }
    }

    /// React to the provider switching networks.
    pub fn on_network_changed(&self, chain_id: ChainId) {
        let _guard = self.lock();
        let current = self.session.load_full();
        let Some(account) = current.account() else {
            return;
        };
        if current.chain_id() == Some(chain_id) {
            return;
        }

        self.session.store(Arc::new(current.with_chain_id(chain_id)));
        self.emit(SessionEvent::NetworkChanged {
            account,
            previous: current.chain_id(),
            current: chain_id,
        });
    }

    pub fn handle_notification(&self, notification: ProviderNotification) {
        match notification {
            ProviderNotification::AccountsChanged(accounts) => self.on_accounts_changed(&accounts),
            ProviderNotification::ChainChanged(id) => self.on_network_changed(ChainId(id)),
        }
    }

    fn establish(
        &self,
        provider: &Arc<dyn SigningProvider>,
        previous: &Session,
        account: Address,
        chain_id: ChainId,
    ) -> Session {
        self.ensure_listening(provider);

        let _guard = self.lock();
        let session = Session::connected(account, chain_id);
        self.session.store(Arc::new(session.clone()));

        let event = match (previous.account(), previous.chain_id()) {
            (Some(old), _) if old != account => SessionEvent::AccountChanged {
                previous: old,
                current: account,
            },
            (Some(_), old_chain) if old_chain != Some(chain_id) => SessionEvent::NetworkChanged {
                account,
                previous: old_chain,
                current: chain_id,
            },
            _ => SessionEvent::Connected { account, chain_id },
        };
        self.emit(event);
        session
    }

    fn fail(&self, previous: &Session, error: SessionError) -> SessionError {
        tracing::warn!(error = %error, "Wallet connection failed");
        let _guard = self.lock();
        self.session.store(Arc::new(Session::error()));
        if previous.is_connected() {
            self.emit(SessionEvent::Disconnected {
                previous: previous.account(),
            });
        }
        error
    }

    /// Forward provider notifications into this session. Idempotent.
    fn ensure_listening(&self, provider: &Arc<dyn SigningProvider>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut notifications = provider.subscribe();
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(notification) => session.handle_notification(notification),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Provider notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("Provider notification channel closed");
                        break;
                    }
                }
            }
        });
        tracing::debug!("Listening for account and network changes");
    }

    fn emit(&self, event: SessionEvent) {
        tracing::info!(event = event.name(), "{}", event);
        metrics::record_session_event(event.name());
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSession")
            .field("has_provider", &self.provider.is_some())
            .field("session", &self.current_session())
            .finish()
    }
}
