//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key) + [provider] config
//!     → wallet.rs (key loading)
//!     → client.rs (RPC connection with timeouts, signing, network watcher)
//!     → provider.rs (SigningProvider seam seen by the rest of the crate)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when no signing provider is present

pub mod client;
pub mod provider;
pub mod types;
pub mod wallet;

pub use client::RpcSigningProvider;
pub use provider::SigningProvider;
pub use types::{BlockchainError, BlockchainResult, ChainId, ProviderNotification, TxReceipt};
pub use wallet::Wallet;
