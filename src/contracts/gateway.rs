//! Typed accessors for the external token, internal token and exchange
//! contracts.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use std::sync::Arc;

use crate::blockchain::{BlockchainError, BlockchainResult, SigningProvider};
use crate::config::ContractsConfig;
use crate::contracts::abi::{IERC20, ITokenExchange};
use crate::contracts::transaction::TransactionHandle;
use crate::contracts::types::{ConfirmationPolicy, GatewayError};
use crate::exchange::amount::TokenAmount;
use crate::exchange::types::{Direction, TokenKind};
use crate::observability::metrics;

/// Request/response access to the three contracts.
#[derive(Clone)]
pub struct ContractGateway {
    provider: Option<Arc<dyn SigningProvider>>,
    contracts: ContractsConfig,
    policy: ConfirmationPolicy,
}

impl ContractGateway {
    pub fn new(
        provider: Option<Arc<dyn SigningProvider>>,
        contracts: ContractsConfig,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            provider,
            contracts,
            policy,
        }
    }

    pub fn token_address(&self, token: TokenKind) -> Address {
        match token {
            TokenKind::External => self.contracts.external_token,
            TokenKind::Internal => self.contracts.internal_token,
        }
    }

    /// Spender of every approval.
    pub fn exchange_address(&self) -> Address {
        self.contracts.exchange
    }

    fn provider(&self) -> BlockchainResult<&Arc<dyn SigningProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| BlockchainError::NotAvailable("no signing provider".to_string()))
    }

    /// Token balance of `account`. Empty return data reads as zero.
    pub async fn balance_of(&self, token: TokenKind, account: Address) -> Result<TokenAmount, GatewayError> {
        let read_error = |reason: String| GatewayError::Read {
            token: token.as_str(),
            reason,
        };
        let provider = self.provider().map_err(|e| read_error(e.to_string()))?;

        let tx = TransactionRequest::default()
            .with_to(self.token_address(token))
            .with_input(IERC20::balanceOfCall { account }.abi_encode());

        let result = provider.call(tx).await;
        metrics::record_gateway_call("balance_of", result.is_ok());
        let raw = result.map_err(|e| read_error(e.to_string()))?;

        if raw.is_empty() {
            tracing::debug!(%token, %account, "Empty balanceOf result, treating as zero");
            return Ok(TokenAmount::ZERO);
        }

        let units = IERC20::balanceOfCall::abi_decode_returns(&raw)
            .map_err(|e| read_error(format!("malformed balanceOf result: {}", e)))?;
        Ok(TokenAmount::from_units(units))
    }

    /// Native coin balance of `account`.
    pub async fn native_balance(&self, account: Address) -> Result<TokenAmount, GatewayError> {
        let provider = self.provider().map_err(|e| GatewayError::Read {
            token: "native",
            reason: e.to_string(),
        })?;

        let result = provider.native_balance(account).await;
        metrics::record_gateway_call("native_balance", result.is_ok());
        result.map(TokenAmount::from_units).map_err(|e| GatewayError::Read {
            token: "native",
            reason: e.to_string(),
        })
    }

    /// Approve the exchange contract to pull exactly `amount` of `token`
    /// from `owner`.
    pub async fn approve(
        &self,
        token: TokenKind,
        owner: Address,
        amount: TokenAmount,
    ) -> Result<TransactionHandle, GatewayError> {
        let call = IERC20::approveCall {
            spender: self.exchange_address(),
            value: amount.units(),
        };
        tracing::info!(%token, %owner, %amount, spender = %self.exchange_address(), "Submitting approve");
        self.submit("approve", owner, self.token_address(token), call.abi_encode().into())
            .await
    }

    /// Call the exchange entry point for `direction` with `amount` of the
    /// input token.
    pub async fn exchange(
        &self,
        direction: Direction,
        owner: Address,
        amount: TokenAmount,
    ) -> Result<TransactionHandle, GatewayError> {
        let units = amount.units();
        let data: Bytes = match direction {
            Direction::ExternalToInternal => {
                ITokenExchange::exchangeEduToMyTokensCall { amount: units }.abi_encode()
            }
            Direction::InternalToExternal => {
                ITokenExchange::exchangeMyTokensToEduCall { amount: units }.abi_encode()
            }
        }
        .into();
        tracing::info!(direction = direction.as_str(), %owner, %amount, "Submitting exchange");
        self.submit("exchange", owner, self.exchange_address(), data).await
    }

    async fn submit(
        &self,
        op: &'static str,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TransactionHandle, GatewayError> {
        let provider = self
            .provider()
            .map_err(|e| GatewayError::Submit {
                op,
                reason: e.to_string(),
            })?
            .clone();

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data);

        let result = provider.send_transaction(tx).await;
        metrics::record_gateway_call(op, result.is_ok());
        let tx_hash = result.map_err(|e| {
            tracing::warn!(op, error = %e, "Submission failed");
            GatewayError::Submit {
                op,
                reason: e.to_string(),
            }
        })?;

        tracing::info!(op, %tx_hash, "Transaction submitted");
        Ok(TransactionHandle::new(provider, tx_hash, self.policy, op))
    }
}

impl std::fmt::Debug for ContractGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractGateway")
            .field("contracts", &self.contracts)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use alloy::primitives::address;

    fn gateway() -> ContractGateway {
        let contracts = ContractsConfig {
            external_token: address!("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            internal_token: address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"),
            exchange: address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"),
        };
        ContractGateway::new(None, contracts, ConfirmationPolicy::default())
    }

    #[test]
    fn test_token_addresses() {
        let gateway = gateway();
        assert_ne!(
            gateway.token_address(TokenKind::External),
            gateway.token_address(TokenKind::Internal)
        );
    }

    #[tokio::test]
    async fn test_without_provider_reads_fail_with_read_error() {
        let err = gateway()
            .balance_of(TokenKind::External, Address::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadError);
        assert!(err.to_string().contains("not available"));
    }

    #[tokio::test]
    async fn test_without_provider_submits_fail_with_submit_error() {
        let err = gateway()
            .approve(TokenKind::Internal, Address::ZERO, TokenAmount::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubmitError);
    }
}
