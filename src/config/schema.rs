//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the exchange
//! daemon. All types derive Serde traits for deserialization from config files.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Signing provider / RPC settings.
    pub provider: ProviderConfig,

    /// Deployed contract addresses.
    pub contracts: ContractsConfig,

    /// Token labels and display precision.
    pub tokens: TokensConfig,

    /// Transaction confirmation polling.
    pub confirmation: ConfirmationConfig,

    /// Presentation API.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Signing provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Run with a signing provider at all. When false every connect fails
    /// with `NoProviderAvailable`.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID the local key signs for (e.g., 1 for mainnet, 31337 for Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// How often the network watcher polls the chain id. 0 disables it.
    pub network_poll_secs: u64,

    /// Block explorer base used for account links.
    pub explorer_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            network_poll_secs: 5,
            explorer_url: "https://etherscan.io".to_string(),
        }
    }
}

/// Addresses of the three contracts the gateway talks to.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractsConfig {
    /// Platform-external token (ERC-20).
    pub external_token: Address,

    /// Platform-internal utility token (ERC-20).
    pub internal_token: Address,

    /// Exchange contract; spender for both approvals.
    pub exchange: Address,
}

/// Token labels and display precision.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokensConfig {
    pub external_symbol: String,
    pub internal_symbol: String,
    /// Fractional digits shown for the external token.
    pub external_display_decimals: usize,
    /// Fractional digits shown for the internal token.
    pub internal_display_decimals: usize,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            external_symbol: "EDU".to_string(),
            internal_symbol: "MyTokens".to_string(),
            external_display_decimals: 4,
            internal_display_decimals: 2,
        }
    }
}

/// Transaction confirmation polling policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Delay between receipt polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Receipt polls before giving up with a timeout.
    pub max_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_attempts: 90,
        }
    }
}

/// Presentation API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Serve the HTTP API.
    pub enabled: bool,

    /// API bind address.
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8090".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ExchangeConfig = toml::from_str("").unwrap();
        assert_eq!(config.confirmation.max_attempts, 90);
        assert_eq!(config.tokens.external_symbol, "EDU");
        assert!(config.contracts.exchange.is_zero());
    }

    #[test]
    fn test_contract_addresses_parse_from_hex() {
        let config: ExchangeConfig = toml::from_str(
            r#"
            [contracts]
            external_token = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
            internal_token = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
            exchange = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"

            [confirmation]
            poll_interval_ms = 50
            "#,
        )
        .unwrap();

        assert!(!config.contracts.exchange.is_zero());
        assert_eq!(config.confirmation.poll_interval_ms, 50);
        assert_eq!(config.confirmation.max_attempts, 90);
    }
}
