//! The fixed conversion rate and quote arithmetic.
//!
//! 1 external token = 100 000 internal tokens (0.01 external = 1000 internal).
//! Both tokens share 18 decimals, so the rate applies unchanged to
//! smallest-unit integers. The contract enforces the real rate; quotes here
//! are advisory.

use serde::Serialize;

use crate::exchange::amount::{AmountError, TokenAmount};
use crate::exchange::types::Direction;

/// Internal units credited per external unit.
pub const INTERNAL_PER_EXTERNAL: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    internal_per_external: u64,
}

impl ExchangeRate {
    pub const fn fixed() -> Self {
        Self {
            internal_per_external: INTERNAL_PER_EXTERNAL,
        }
    }

    /// Output amount for `input` sent in `direction`.
    ///
    /// The reverse direction truncates toward zero when the input is not a
    /// multiple of the rate.
    pub fn quote(&self, direction: Direction, input: TokenAmount) -> Result<TokenAmount, AmountError> {
        match direction {
            Direction::ExternalToInternal => input
                .checked_mul(self.internal_per_external)
                .ok_or(AmountError::Overflow),
            Direction::InternalToExternal => Ok(input.div_floor(self.internal_per_external)),
        }
    }

    /// Human readable rate, e.g. `0.01 EDU = 1000 MyTokens`.
    pub fn describe(&self, direction: Direction, external_symbol: &str, internal_symbol: &str) -> String {
        // 0.01 of the external token
        let external = TokenAmount::from_units(alloy::primitives::U256::from(10_000_000_000_000_000u64));
        let internal = external
            .checked_mul(self.internal_per_external)
            .unwrap_or(TokenAmount::ZERO);
        match direction {
            Direction::ExternalToInternal => {
                format!("{} {} = {} {}", external, external_symbol, internal, internal_symbol)
            }
            Direction::InternalToExternal => {
                format!("{} {} = {} {}", internal, internal_symbol, external, external_symbol)
            }
        }
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::fixed()
    }
}
