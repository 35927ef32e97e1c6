//! Fixed-point token amounts.
//!
//! Both tokens use 18 decimals. Amounts live as smallest-unit `U256` values
//! and are only turned into decimal text at the presentation edge.

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits of both tokens.
pub const TOKEN_DECIMALS: usize = 18;

/// Why a user-entered amount was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a non-negative decimal number")]
    NotNumeric(String),

    #[error("more than 18 fractional digits")]
    TooPrecise,

    #[error("amount out of range")]
    Overflow,
}

/// A token amount in smallest units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(U256);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(U256::ZERO);

    pub const fn from_units(units: U256) -> Self {
        Self(units)
    }

    pub const fn units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse user input such as `"0.01"`, `"5"`, `".5"` or `"5."`.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if !s.chars().all(|c| c.is_ascii_digit() || c == '.') || s.matches('.').count() > 1 {
            return Err(AmountError::NotNumeric(s.to_string()));
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::NotNumeric(s.to_string()));
        }
        if frac.len() > TOKEN_DECIMALS {
            return Err(AmountError::TooPrecise);
        }

        let normalized = format!(
            "{}.{}",
            if whole.is_empty() { "0" } else { whole },
            if frac.is_empty() { "0" } else { frac }
        );
        parse_ether(&normalized)
            .map(Self)
            .map_err(|_| AmountError::Overflow)
    }

    /// Decimal text with exactly `places` fractional digits, truncated.
    pub fn to_fixed(&self, places: usize) -> String {
        let full = format_ether(self.0);
        let (whole, frac) = full.split_once('.').unwrap_or((full.as_str(), ""));
        if places == 0 {
            return whole.to_string();
        }
        let mut digits: String = frac.chars().take(places).collect();
        while digits.len() < places {
            digits.push('0');
        }
        format!("{}.{}", whole, digits)
    }

    pub fn checked_mul(&self, factor: u64) -> Option<Self> {
        self.0.checked_mul(U256::from(factor)).map(Self)
    }

    /// Integer division, truncating toward zero.
    pub fn div_floor(&self, divisor: u64) -> Self {
        Self(self.0 / U256::from(divisor))
    }
}

impl std::fmt::Display for TokenAmount {
    /// Shortest exact decimal form: `1000`, `0.01`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let full = format_ether(self.0);
        let trimmed = if full.contains('.') {
            full.trim_end_matches('0').trim_end_matches('.')
        } else {
            full.as_str()
        };
        f.write_str(trimmed)
    }
}

impl FromStr for TokenAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> U256 {
        TokenAmount::parse(s).unwrap().units()
    }

    #[test]
    fn test_parse_scales_to_smallest_units() {
        assert_eq!(units("1"), U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(units("0.01"), U256::from(10_000_000_000_000_000u128));
        assert_eq!(units(".5"), units("0.5"));
        assert_eq!(units("5."), units("5"));
        assert_eq!(units("0.000000000000000001"), U256::from(1u8));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(TokenAmount::parse(""), Err(AmountError::Empty));
        assert_eq!(TokenAmount::parse("   "), Err(AmountError::Empty));
        assert!(matches!(TokenAmount::parse("-1"), Err(AmountError::NotNumeric(_))));
        assert!(matches!(TokenAmount::parse("1e5"), Err(AmountError::NotNumeric(_))));
        assert!(matches!(TokenAmount::parse("1.2.3"), Err(AmountError::NotNumeric(_))));
        assert!(matches!(TokenAmount::parse("."), Err(AmountError::NotNumeric(_))));
        assert_eq!(
            TokenAmount::parse("0.0000000000000000001"),
            Err(AmountError::TooPrecise)
        );
    }

    #[test]
    fn test_zero_parses_but_is_zero() {
        assert!(TokenAmount::parse("0").unwrap().is_zero());
        assert!(TokenAmount::parse("0.000").unwrap().is_zero());
    }

    #[test]
    fn test_display_is_shortest_exact_form() {
        assert_eq!(TokenAmount::parse("1000").unwrap().to_string(), "1000");
        assert_eq!(TokenAmount::parse("0.0100").unwrap().to_string(), "0.01");
        assert_eq!(TokenAmount::ZERO.to_string(), "0");
    }

    #[test]
    fn test_to_fixed_truncates() {
        let amount = TokenAmount::parse("12.345678").unwrap();
        assert_eq!(amount.to_fixed(4), "12.3456");
        assert_eq!(amount.to_fixed(2), "12.34");
        assert_eq!(amount.to_fixed(0), "12");
        assert_eq!(TokenAmount::parse("3").unwrap().to_fixed(2), "3.00");
    }

    #[test]
    fn test_serde_uses_decimal_text() {
        let amount = TokenAmount::parse("0.01").unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"0.01\"");
        let back: TokenAmount = serde_json::from_str("\"0.01\"").unwrap();
        assert_eq!(back, amount);
    }
}
