//! Balance synchronization subsystem.
//!
//! # Data Flow
//! ```text
//! SessionEvent (connected / account / network changed)   ExchangeEngine (confirmed)
//!     └──────────────────────┬──────────────────────────────────┘
//!                            → refresh(account)
//!                            → ContractGateway balance reads (concurrent)
//!                            → BalanceSnapshot in ArcSwapOption
//! ```

pub mod synchronizer;

pub use synchronizer::{BalanceSnapshot, BalanceSynchronizer};
