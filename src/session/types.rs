//! Session values, events and errors.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::blockchain::ChainId;
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Snapshot of the wallet connection.
///
/// The constructors keep `account` set exactly when the status is
/// `Connected`; there is no way to build any other combination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Session {
    account: Option<Address>,
    chain_id: Option<ChainId>,
    status: SessionStatus,
}

impl Session {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connecting() -> Self {
        Self {
            status: SessionStatus::Connecting,
            ..Self::default()
        }
    }

    pub fn connected(account: Address, chain_id: ChainId) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
            status: SessionStatus::Connected,
        }
    }

    pub fn error() -> Self {
        Self {
            status: SessionStatus::Error,
            ..Self::default()
        }
    }

    /// Same session with another active account. Only meaningful when connected.
    pub fn with_account(&self, account: Address) -> Self {
        match self.chain_id {
            Some(chain_id) if self.is_connected() => Self::connected(account, chain_id),
            _ => self.clone(),
        }
    }

    pub fn with_chain_id(&self, chain_id: ChainId) -> Self {
        Self {
            chain_id: Some(chain_id),
            ..self.clone()
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }
}

/// Changes published by the provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Connected {
        account: Address,
        chain_id: ChainId,
    },
    AccountChanged {
        previous: Address,
        current: Address,
    },
    NetworkChanged {
        account: Address,
        previous: Option<ChainId>,
        current: ChainId,
    },
    Disconnected {
        previous: Option<Address>,
    },
}

impl SessionEvent {
    /// Whether an exchange in flight must be abandoned on this event.
    pub fn invalidates_exchange(&self) -> bool {
        !matches!(self, SessionEvent::Connected { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Connected { .. } => "connected",
            SessionEvent::AccountChanged { .. } => "account_changed",
            SessionEvent::NetworkChanged { .. } => "network_changed",
            SessionEvent::Disconnected { .. } => "disconnected",
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::Connected { account, chain_id } => {
                write!(f, "connected {} on chain {}", short_address(account), chain_id)
            }
            SessionEvent::AccountChanged { previous, current } => write!(
                f,
                "account changed from {} to {}",
                short_address(previous),
                short_address(current)
            ),
            SessionEvent::NetworkChanged {
                previous, current, ..
            } => match previous {
                Some(previous) => write!(f, "network changed from {} to {}", previous, current),
                None => write!(f, "network changed to {}", current),
            },
            SessionEvent::Disconnected { .. } => f.write_str("wallet disconnected"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No signing provider available")]
    NoProviderAvailable,

    #[error("Connection request rejected: {0}")]
    UserRejected(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NoProviderAvailable => ErrorKind::NoProviderAvailable,
            SessionError::UserRejected(_) => ErrorKind::UserRejected,
            SessionError::ConnectFailed(_) => ErrorKind::ConnectFailed,
        }
    }
}

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Block explorer page for `address`.
pub fn explorer_link(explorer_url: &str, address: &Address) -> String {
    format!("{}/address/{}", explorer_url.trim_end_matches('/'), address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

    #[test]
    fn test_account_present_only_when_connected() {
        assert_eq!(Session::disconnected().account(), None);
        assert_eq!(Session::connecting().account(), None);
        assert_eq!(Session::error().account(), None);

        let session = Session::connected(ALICE, ChainId(1));
        assert!(session.is_connected());
        assert_eq!(session.account(), Some(ALICE));
    }

    #[test]
    fn test_with_account_keeps_network() {
        let session = Session::connected(ALICE, ChainId(5)).with_account(BOB);
        assert_eq!(session.account(), Some(BOB));
        assert_eq!(session.chain_id(), Some(ChainId(5)));

        // Not connected: nothing to switch
        let session = Session::disconnected().with_account(BOB);
        assert_eq!(session.account(), None);
    }

    #[test]
    fn test_only_connected_event_keeps_exchange_alive() {
        assert!(!SessionEvent::Connected {
            account: ALICE,
            chain_id: ChainId(1)
        }
        .invalidates_exchange());
        assert!(SessionEvent::AccountChanged {
            previous: ALICE,
            current: BOB
        }
        .invalidates_exchange());
        assert!(SessionEvent::Disconnected { previous: None }.invalidates_exchange());
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address(&ALICE), "0xf39F...2266");
    }

    #[test]
    fn test_explorer_link() {
        let link = explorer_link("https://etherscan.io/", &ALICE);
        assert!(link.starts_with("https://etherscan.io/address/0x"));
        assert!(link.to_lowercase().ends_with("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SessionError::NoProviderAvailable.kind(),
            ErrorKind::NoProviderAvailable
        );
        assert_eq!(
            SessionError::UserRejected("denied".into()).kind(),
            ErrorKind::UserRejected
        );
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(SessionEvent::Disconnected { previous: None }).unwrap();
        assert_eq!(json["event"], "disconnected");
    }
}
