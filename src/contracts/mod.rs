//! Contract gateway subsystem.
//!
//! # Data Flow
//! ```text
//! ExchangeEngine / BalanceSynchronizer
//!     → gateway.rs (sol! calldata, eth_call / sign + submit)
//!     → SigningProvider
//!     → transaction.rs (receipt polling under ConfirmationPolicy)
//! ```

pub mod abi;
pub mod gateway;
pub mod transaction;
pub mod types;

pub use gateway::ContractGateway;
pub use transaction::TransactionHandle;
pub use types::{ConfirmationPolicy, GatewayError};
