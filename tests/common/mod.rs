//! Shared utilities for integration tests: a scripted signing provider and
//! a fully wired engine around it.

#![allow(dead_code)]

use alloy::primitives::{address, Address, Bytes, TxHash, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use token_exchange::balances::BalanceSynchronizer;
use token_exchange::blockchain::{
    BlockchainError, ChainId, ProviderNotification, SigningProvider, TxReceipt,
};
use token_exchange::config::ContractsConfig;
use token_exchange::contracts::abi::{ITokenExchange, IERC20};
use token_exchange::contracts::{ConfirmationPolicy, ContractGateway};
use token_exchange::exchange::TokenAmount;
use token_exchange::session::ProviderSession;
use token_exchange::ExchangeEngine;

pub const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

pub const EXTERNAL_TOKEN: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const INTERNAL_TOKEN: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const EXCHANGE: Address = address!("0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0");

pub const APPROVE: [u8; 4] = IERC20::approveCall::SELECTOR;
pub const BALANCE_OF: [u8; 4] = IERC20::balanceOfCall::SELECTOR;
pub const EDU_TO_MY: [u8; 4] = ITokenExchange::exchangeEduToMyTokensCall::SELECTOR;
pub const MY_TO_EDU: [u8; 4] = ITokenExchange::exchangeMyTokensToEduCall::SELECTOR;

/// How the mock answers receipt polls for a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptBehavior {
    Confirm,
    Revert,
    Pending,
}

/// A transaction the mock was asked to sign and submit.
#[derive(Debug, Clone)]
pub struct SentTx {
    pub selector: [u8; 4],
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub data: Bytes,
    pub hash: TxHash,
}

#[derive(Debug)]
pub struct MockState {
    pub accounts: Vec<Address>,
    /// Whether `accounts()` reports the accounts without a prompt.
    pub authorized: bool,
    pub reject_connect: bool,
    pub chain_id: u64,
    /// (token contract, owner) → smallest units.
    pub balances: HashMap<(Address, Address), U256>,
    pub native: U256,
    pub failing_reads: HashSet<Address>,
    pub empty_reads: HashSet<Address>,
    /// Held after a token balance is read and before it is returned.
    pub read_delay: Option<Duration>,
    pub receipts: HashMap<[u8; 4], ReceiptBehavior>,
    pub reject_submit: HashSet<[u8; 4]>,
    pub sent: Vec<SentTx>,
    pub balance_reads: usize,
    pub receipt_polls: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            accounts: vec![ALICE],
            authorized: false,
            reject_connect: false,
            chain_id: 31337,
            balances: HashMap::new(),
            native: U256::ZERO,
            failing_reads: HashSet::new(),
            empty_reads: HashSet::new(),
            read_delay: None,
            receipts: HashMap::new(),
            reject_submit: HashSet::new(),
            sent: Vec::new(),
            balance_reads: 0,
            receipt_polls: 0,
        }
    }
}

/// Scripted in-memory signing provider.
pub struct MockProvider {
    state: Mutex<MockState>,
    notifications: broadcast::Sender<ProviderNotification>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        let (notifications, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
            notifications,
        })
    }

    /// Mutate the script.
    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: &str) {
        let units = TokenAmount::parse(amount).unwrap().units();
        self.with(|s| s.balances.insert((token, owner), units));
    }

    pub fn set_receipt(&self, selector: [u8; 4], behavior: ReceiptBehavior) {
        self.with(|s| s.receipts.insert(selector, behavior));
    }

    /// Selectors of every submitted transaction, in order.
    pub fn sent_selectors(&self) -> Vec<[u8; 4]> {
        self.with(|s| s.sent.iter().map(|tx| tx.selector).collect())
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.with(|s| s.sent.clone())
    }

    pub fn balance_reads(&self) -> usize {
        self.with(|s| s.balance_reads)
    }

    /// Push a notification as the wallet would.
    pub fn emit(&self, notification: ProviderNotification) {
        let _ = self.notifications.send(notification);
    }
}

fn selector_of(data: &[u8]) -> [u8; 4] {
    let mut selector = [0u8; 4];
    if data.len() >= 4 {
        selector.copy_from_slice(&data[..4]);
    }
    selector
}

fn target(tx: &TransactionRequest) -> Option<Address> {
    tx.to.and_then(|kind| kind.to().copied())
}

#[async_trait]
impl SigningProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, BlockchainError> {
        self.with(|s| {
            if s.reject_connect {
                return Err(BlockchainError::Rejected("user rejected the request".into()));
            }
            s.authorized = true;
            Ok(s.accounts.clone())
        })
    }

    async fn accounts(&self) -> Result<Vec<Address>, BlockchainError> {
        Ok(self.with(|s| if s.authorized { s.accounts.clone() } else { Vec::new() }))
    }

    async fn chain_id(&self) -> Result<ChainId, BlockchainError> {
        Ok(ChainId(self.with(|s| s.chain_id)))
    }

    async fn native_balance(&self, _account: Address) -> Result<U256, BlockchainError> {
        Ok(self.with(|s| s.native))
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, BlockchainError> {
        let to = target(&tx).ok_or_else(|| BlockchainError::Rpc("call without target".into()))?;
        let data = tx.input.input().cloned().unwrap_or_default();
        if selector_of(&data) != BALANCE_OF || data.len() < 36 {
            return Err(BlockchainError::Rpc("unsupported call".into()));
        }
        let owner = Address::from_slice(&data[16..36]);

        let (result, delay) = self.with(|s| {
            s.balance_reads += 1;
            let result = if s.failing_reads.contains(&to) {
                Err(BlockchainError::Rpc("connection reset".into()))
            } else if s.empty_reads.contains(&to) {
                Ok(Bytes::new())
            } else {
                let units = s.balances.get(&(to, owner)).copied().unwrap_or_default();
                Ok(Bytes::from(units.to_be_bytes::<32>().to_vec()))
            };
            (result, s.read_delay)
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, BlockchainError> {
        let data = tx.input.input().cloned().unwrap_or_default();
        let selector = selector_of(&data);

        self.with(|s| {
            if s.reject_submit.contains(&selector) {
                return Err(BlockchainError::Rejected("user denied transaction signature".into()));
            }
            let hash = B256::with_last_byte((s.sent.len() + 1) as u8);
            s.sent.push(SentTx {
                selector,
                from: tx.from,
                to: target(&tx),
                data,
                hash,
            });
            Ok(hash)
        })
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, BlockchainError> {
        self.with(|s| {
            s.receipt_polls += 1;
            let selector = s
                .sent
                .iter()
                .find(|tx| tx.hash == tx_hash)
                .map(|tx| tx.selector)
                .ok_or_else(|| BlockchainError::Rpc("unknown transaction".into()))?;

            let receipt = |success| {
                Some(TxReceipt {
                    tx_hash,
                    block_number: Some(1),
                    success,
                })
            };
            Ok(match s.receipts.get(&selector).copied().unwrap_or(ReceiptBehavior::Confirm) {
                ReceiptBehavior::Confirm => receipt(true),
                ReceiptBehavior::Revert => receipt(false),
                ReceiptBehavior::Pending => None,
            })
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderNotification> {
        self.notifications.subscribe()
    }
}

/// Engine, synchronizer, gateway and session wired to one mock.
pub struct Harness {
    pub mock: Arc<MockProvider>,
    pub session: ProviderSession,
    pub gateway: ContractGateway,
    pub balances: BalanceSynchronizer,
    pub engine: Arc<ExchangeEngine>,
}

pub fn contracts() -> ContractsConfig {
    ContractsConfig {
        external_token: EXTERNAL_TOKEN,
        internal_token: INTERNAL_TOKEN,
        exchange: EXCHANGE,
    }
}

/// Receipts are polled every 5ms, 40 times.
pub fn fast_policy() -> ConfirmationPolicy {
    ConfirmationPolicy {
        poll_interval: Duration::from_millis(5),
        max_attempts: 40,
    }
}

/// Receipts are polled every 5ms for up to ten seconds.
pub fn patient_policy() -> ConfirmationPolicy {
    ConfirmationPolicy {
        poll_interval: Duration::from_millis(5),
        max_attempts: 2000,
    }
}

pub fn harness(mock: Arc<MockProvider>) -> Harness {
    harness_with(mock, fast_policy())
}

pub fn harness_with(mock: Arc<MockProvider>, policy: ConfirmationPolicy) -> Harness {
    let provider: Arc<dyn SigningProvider> = mock.clone();
    let session = ProviderSession::new(Some(provider.clone()));
    let gateway = ContractGateway::new(Some(provider), contracts(), policy);
    let balances = BalanceSynchronizer::new(session.clone(), gateway.clone());
    let engine = Arc::new(ExchangeEngine::new(
        session.clone(),
        gateway.clone(),
        balances.clone(),
    ));
    Harness {
        mock,
        session,
        gateway,
        balances,
        engine,
    }
}

impl Harness {
    /// Connect and load balances, as the running daemon would.
    pub async fn connect(&self) {
        let session = self.engine.connect().await.unwrap();
        self.balances.refresh(session.account().unwrap()).await;
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}
