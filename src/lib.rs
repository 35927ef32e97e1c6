//! Token exchange client library.
//!
//! Wallet session management and the approve-then-swap exchange flow
//! between a platform-external token and a platform-internal utility token.

pub mod balances;
pub mod blockchain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod exchange;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod session;

pub use config::schema::ExchangeConfig;
pub use error::ErrorKind;
pub use exchange::ExchangeEngine;
pub use lifecycle::Shutdown;
