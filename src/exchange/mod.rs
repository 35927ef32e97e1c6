//! Exchange subsystem.
//!
//! # Data Flow
//! ```text
//! set_amount / set_max / toggle_direction
//!     → amount.rs (decimal text → smallest units)
//!     → rate.rs (advisory quote at the fixed rate)
//!
//! execute
//!     → guards (connected, amount > 0, cached balance)
//!     → approve → await → exchange → await   (preempted by session events)
//!     → BalanceSynchronizer::refresh → Idle
//! ```

pub mod amount;
pub mod engine;
pub mod rate;
pub mod types;

pub use amount::{AmountError, TokenAmount};
pub use engine::{BalanceView, EngineView, ExchangeEngine, Quote};
pub use rate::{ExchangeRate, INTERNAL_PER_EXTERNAL};
pub use types::{Direction, ExchangeError, ExchangeTransaction, Failure, Phase, TokenKind};
