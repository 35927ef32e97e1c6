//! Provider session subsystem.
//!
//! # Data Flow
//! ```text
//! connect() / try_resume()
//!     → SigningProvider (request accounts, network id)
//!     → Session stored in ArcSwap
//!     → SessionEvent broadcast
//!
//! SigningProvider notifications (accounts / chain changed)
//!     → forwarder task → on_accounts_changed / on_network_changed
//!     → SessionEvent broadcast → balance synchronizer, exchange engine
//! ```

pub mod manager;
pub mod types;

pub use manager::ProviderSession;
pub use types::{explorer_link, short_address, Session, SessionError, SessionEvent, SessionStatus};
