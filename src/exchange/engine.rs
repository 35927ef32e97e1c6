//! The exchange engine: intent, quote, and the approve-then-swap saga.

use alloy::primitives::Address;
use dashmap::DashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::balances::BalanceSynchronizer;
use crate::config::TokensConfig;
use crate::contracts::{ContractGateway, GatewayError};
use crate::exchange::amount::TokenAmount;
use crate::exchange::rate::ExchangeRate;
use crate::exchange::types::{
    Direction, ExchangeError, ExchangeTransaction, Failure, Phase, TokenKind,
};
use crate::observability::metrics;
use crate::session::{explorer_link, short_address, ProviderSession, Session, SessionEvent};

/// The current intent priced at the fixed rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub direction: Direction,
    /// Parsed input, `None` when the text is empty or not a number.
    pub input: Option<TokenAmount>,
    /// Zero whenever the input is not executable.
    pub output: TokenAmount,
    pub executable: bool,
    /// Why the input cannot be executed.
    pub problem: Option<String>,
}

impl Quote {
    fn empty(direction: Direction) -> Self {
        Self {
            direction,
            input: None,
            output: TokenAmount::ZERO,
            executable: false,
            problem: None,
        }
    }
}

#[derive(Debug, Clone)]
struct EngineState {
    raw_input: String,
    quote: Quote,
    phase: Phase,
    /// Set from the moment execute passes its guards until the post-confirm
    /// refresh has finished.
    busy: bool,
    last_error: Option<Failure>,
    last_transaction: Option<Uuid>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            raw_input: String::new(),
            quote: Quote::empty(Direction::default()),
            phase: Phase::Idle,
            busy: false,
            last_error: None,
            last_transaction: None,
        }
    }
}

impl EngineState {
    fn reset_intent(&mut self) {
        self.raw_input.clear();
        self.quote = Quote::empty(self.quote.direction);
        self.phase = Phase::Idle;
    }
}

/// Formatted balances for display.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    pub external: String,
    pub internal: String,
    pub native: Option<String>,
    pub stale: Vec<TokenKind>,
    pub as_of: u64,
}

/// Everything a UI may observe.
#[derive(Debug, Clone, Serialize)]
pub struct EngineView {
    pub session: Session,
    pub account_short: Option<String>,
    pub explorer_link: Option<String>,
    pub balances: Option<BalanceView>,
    pub direction: Direction,
    pub input_symbol: String,
    pub output_symbol: String,
    pub raw_input: String,
    pub quote: Quote,
    pub output_display: String,
    pub rate: String,
    pub phase: Phase,
    pub busy: bool,
    pub last_error: Option<Failure>,
    pub last_transaction: Option<ExchangeTransaction>,
}

/// Drives exchanges for one provider session.
///
/// At most one exchange runs at a time. Session events that arrive while it
/// runs preempt it with `SessionInvalidated`.
pub struct ExchangeEngine {
    session: ProviderSession,
    gateway: ContractGateway,
    balances: BalanceSynchronizer,
    rate: ExchangeRate,
    tokens: TokensConfig,
    explorer_url: String,
    state: RwLock<EngineState>,
    history: DashMap<Uuid, ExchangeTransaction>,
}

impl ExchangeEngine {
    pub fn new(session: ProviderSession, gateway: ContractGateway, balances: BalanceSynchronizer) -> Self {
        Self {
            session,
            gateway,
            balances,
            rate: ExchangeRate::fixed(),
            tokens: TokensConfig::default(),
            explorer_url: crate::config::ProviderConfig::default().explorer_url,
            state: RwLock::new(EngineState::default()),
            history: DashMap::new(),
        }
    }

    /// Token labels, display precision and explorer base for [`Self::view`].
    pub fn with_display(mut self, tokens: TokensConfig, explorer_url: impl Into<String>) -> Self {
        self.tokens = tokens;
        self.explorer_url = explorer_url.into();
        self
    }

    pub fn session(&self) -> &ProviderSession {
        &self.session
    }

    pub fn balances(&self) -> &BalanceSynchronizer {
        &self.balances
    }

    pub async fn connect(&self) -> Result<Session, ExchangeError> {
        Ok(self.session.connect().await?)
    }

    pub async fn disconnect(&self) {
        self.session.disconnect();
        let mut state = self.state.write().await;
        if !state.busy {
            state.reset_intent();
        }
    }

    /// Set the intent and price it.
    ///
    /// Invalid or zero input is accepted: the quote then has a zero output
    /// and is not executable.
    pub async fn set_amount(&self, direction: Direction, raw: &str) -> Result<Quote, ExchangeError> {
        let mut state = self.state.write().await;
        if state.busy {
            return Err(ExchangeError::InFlight);
        }
        Ok(self.apply_intent(&mut state, direction, raw))
    }

    /// Fill the intent with the full cached balance of the input token.
    pub async fn set_max(&self) -> Result<Quote, ExchangeError> {
        let account = self
            .session
            .current_session()
            .account()
            .ok_or(ExchangeError::NotConnected)?;

        let mut state = self.state.write().await;
        if state.busy {
            return Err(ExchangeError::InFlight);
        }
        let direction = state.quote.direction;
        let max = self.cached_balance(account, direction.input_token());
        Ok(self.apply_intent(&mut state, direction, &max.to_string()))
    }

    /// Swap input and output tokens and clear the amount.
    pub async fn toggle_direction(&self) -> Result<Quote, ExchangeError> {
        let mut state = self.state.write().await;
        if state.busy {
            return Err(ExchangeError::InFlight);
        }
        let direction = state.quote.direction.reversed();
        state.raw_input.clear();
        state.quote = Quote::empty(direction);
        state.phase = Phase::Idle;
        state.last_error = None;
        Ok(state.quote.clone())
    }

    fn apply_intent(&self, state: &mut EngineState, direction: Direction, raw: &str) -> Quote {
        state.raw_input = raw.to_string();
        state.last_error = None;

        if raw.trim().is_empty() {
            state.quote = Quote::empty(direction);
            state.phase = Phase::Idle;
            return state.quote.clone();
        }

        let quoted = TokenAmount::parse(raw).and_then(|input| {
            self.rate
                .quote(direction, input)
                .map(|output| (input, output))
        });
        state.quote = match quoted {
            Ok((input, _)) if input.is_zero() => Quote {
                input: Some(input),
                problem: Some("amount must be greater than zero".to_string()),
                ..Quote::empty(direction)
            },
            Ok((input, output)) if output.is_zero() => Quote {
                input: Some(input),
                problem: Some("amount too small to receive any output".to_string()),
                ..Quote::empty(direction)
            },
            Ok((input, output)) => Quote {
                direction,
                input: Some(input),
                output,
                executable: true,
                problem: None,
            },
            Err(e) => Quote {
                problem: Some(e.to_string()),
                ..Quote::empty(direction)
            },
        };
        state.phase = Phase::Quoting;

        tracing::debug!(
            direction = direction.as_str(),
            input = %raw,
            output = %state.quote.output,
            executable = state.quote.executable,
            "Quote updated"
        );
        state.quote.clone()
    }

    /// Run the approve-then-swap saga for the current intent.
    ///
    /// Returns the confirmed transaction record. Guard failures are recorded
    /// as failed transactions without touching the network.
    ///
    /// Once the guards pass the saga runs on its own task. Dropping the
    /// returned future stops the wait, not the exchange: it still ends in
    /// `Confirmed` or `Failed` and releases the engine.
    pub async fn execute(self: &Arc<Self>) -> Result<ExchangeTransaction, ExchangeError> {
        // Subscribe before the guards so nothing slips between check and saga.
        let events = self.session.subscribe();

        let (record, account) = {
            let mut state = self.state.write().await;
            if state.busy {
                tracing::warn!("Execute rejected, an exchange is already in flight");
                return Err(ExchangeError::InFlight);
            }

            let session = self.session.current_session();
            let quote = state.quote.clone();
            let mut record = ExchangeTransaction::new(
                &session,
                quote.direction,
                quote.input.unwrap_or(TokenAmount::ZERO),
                quote.output,
            );

            let account = match self.check_guards(&state, &session) {
                Ok(account) => account,
                Err(err) => {
                    let failure = Failure::from_error(&err, Phase::Quoting);
                    tracing::info!(kind = %failure.kind, "Exchange rejected before submission: {}", err);
                    metrics::record_exchange_outcome(record.direction.as_str(), failure.kind.as_str());
                    record.fail(failure.clone());
                    state.phase = Phase::Failed;
                    state.last_error = Some(failure);
                    state.last_transaction = Some(record.id);
                    self.history.insert(record.id, record);
                    return Err(err);
                }
            };

            record.phase = Phase::Approving;
            state.busy = true;
            state.phase = Phase::Approving;
            state.last_error = None;
            state.last_transaction = Some(record.id);
            self.history.insert(record.id, record.clone());
            (record, account)
        };

        metrics::record_exchange_attempt();
        tracing::info!(
            id = %record.id,
            %account,
            direction = record.direction.as_str(),
            input = %record.input_amount,
            expected_output = %record.expected_output,
            "Exchange started"
        );

        let engine = Arc::clone(self);
        let saga = tokio::spawn(async move { engine.drive(record, account, events).await });
        match saga.await {
            Ok(result) => result,
            Err(e) => match e.try_into_panic() {
                Ok(panic) => std::panic::resume_unwind(panic),
                Err(e) => Err(ExchangeError::SessionInvalidated {
                    reason: e.to_string(),
                }),
            },
        }
    }

    async fn drive(
        &self,
        mut record: ExchangeTransaction,
        account: Address,
        mut events: broadcast::Receiver<SessionEvent>,
    ) -> Result<ExchangeTransaction, ExchangeError> {
        match self.run_saga(&mut record, account, &mut events).await {
            Ok(()) => Ok(self.finish_confirmed(record).await),
            Err(err) => Err(self.finish_failed(record, err).await),
        }
    }

    /// Local checks, in order: connected, positive amount, enough balance.
    fn check_guards(&self, state: &EngineState, session: &Session) -> Result<Address, ExchangeError> {
        let account = session.account().ok_or(ExchangeError::NotConnected)?;

        let input = match state.quote.input {
            Some(input) if !input.is_zero() && state.quote.executable => input,
            _ => return Err(ExchangeError::InvalidAmount(state.raw_input.clone())),
        };

        let token = state.quote.direction.input_token();
        let available = self.cached_balance(account, token);
        if input > available {
            return Err(ExchangeError::InsufficientBalance {
                token,
                requested: input,
                available,
            });
        }
        Ok(account)
    }

    async fn run_saga(
        &self,
        record: &mut ExchangeTransaction,
        account: Address,
        events: &mut broadcast::Receiver<SessionEvent>,
    ) -> Result<(), ExchangeError> {
        let direction = record.direction;
        let amount = record.input_amount;

        let approval = preemptible(
            events,
            Phase::Approving,
            self.gateway.approve(direction.input_token(), account, amount),
        )
        .await?;
        record.tx_hash_approve = Some(approval.tx_hash());
        self.checkpoint(record);
        preemptible(events, Phase::Approving, approval.await_confirmation()).await?;
        self.advance(record, Phase::Approved).await;

        self.advance(record, Phase::Swapping).await;
        let swap = preemptible(
            events,
            Phase::Swapping,
            self.gateway.exchange(direction, account, amount),
        )
        .await?;
        record.tx_hash_swap = Some(swap.tx_hash());
        self.checkpoint(record);
        preemptible(events, Phase::Swapping, swap.await_confirmation()).await?;

        Ok(())
    }

    async fn advance(&self, record: &mut ExchangeTransaction, phase: Phase) {
        tracing::debug!(id = %record.id, from = %record.phase, to = %phase, "Exchange phase");
        record.phase = phase;
        self.checkpoint(record);
        self.state.write().await.phase = phase;
    }

    fn checkpoint(&self, record: &ExchangeTransaction) {
        self.history.insert(record.id, record.clone());
    }

    async fn finish_confirmed(&self, mut record: ExchangeTransaction) -> ExchangeTransaction {
        record.confirm();
        self.checkpoint(&record);

        // Still busy here: no new intent until balances reflect the swap.
        if let Some(account) = record.account {
            self.balances.refresh(account).await;
        }

        let mut state = self.state.write().await;
        state.busy = false;
        state.reset_intent();
        state.last_error = None;
        state.last_transaction = Some(record.id);

        metrics::record_exchange_outcome(record.direction.as_str(), "confirmed");
        tracing::info!(
            id = %record.id,
            tx_hash_approve = ?record.tx_hash_approve,
            tx_hash_swap = ?record.tx_hash_swap,
            "Exchange confirmed"
        );
        record
    }

    async fn finish_failed(&self, mut record: ExchangeTransaction, err: ExchangeError) -> ExchangeError {
        let failure = Failure::from_error(&err, record.phase);
        record.fail(failure.clone());
        self.checkpoint(&record);

        let mut state = self.state.write().await;
        state.busy = false;
        state.phase = Phase::Failed;
        state.last_error = Some(failure.clone());
        state.last_transaction = Some(record.id);
        if !self.session.current_session().is_connected() {
            state.reset_intent();
            state.phase = Phase::Failed;
        }

        let tx_hash = match &err {
            ExchangeError::Gateway { source, .. } => source.tx_hash(),
            _ => None,
        };
        metrics::record_exchange_outcome(record.direction.as_str(), failure.kind.as_str());
        tracing::warn!(
            id = %record.id,
            phase = %failure.phase,
            tx_hash = ?tx_hash,
            kind = %failure.kind,
            engine_initiated = failure.engine_initiated,
            "Exchange failed: {}",
            err
        );
        err
    }

    /// Cached balance of `token` for `account`; zero without a snapshot.
    fn cached_balance(&self, account: Address, token: TokenKind) -> TokenAmount {
        self.balances
            .snapshot_for(account)
            .map(|s| s.balance(token))
            .unwrap_or(TokenAmount::ZERO)
    }

    pub fn transaction(&self, id: &Uuid) -> Option<ExchangeTransaction> {
        self.history.get(id).map(|entry| entry.value().clone())
    }

    pub async fn last_transaction(&self) -> Option<ExchangeTransaction> {
        let id = self.state.read().await.last_transaction?;
        self.transaction(&id)
    }

    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    pub async fn last_error(&self) -> Option<Failure> {
        self.state.read().await.last_error.clone()
    }

    pub async fn quote(&self) -> Quote {
        self.state.read().await.quote.clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.state.read().await.busy
    }

    pub fn symbol(&self, token: TokenKind) -> &str {
        match token {
            TokenKind::External => &self.tokens.external_symbol,
            TokenKind::Internal => &self.tokens.internal_symbol,
        }
    }

    fn display_decimals(&self, token: TokenKind) -> usize {
        match token {
            TokenKind::External => self.tokens.external_display_decimals,
            TokenKind::Internal => self.tokens.internal_display_decimals,
        }
    }

    /// Read-only snapshot of everything observable.
    pub async fn view(&self) -> EngineView {
        let state = self.state.read().await.clone();
        let session = self.session.current_session();
        let direction = state.quote.direction;

        let balances = session
            .account()
            .and_then(|account| self.balances.snapshot_for(account))
            .map(|s| BalanceView {
                external: s.external.to_fixed(self.display_decimals(TokenKind::External)),
                internal: s.internal.to_fixed(self.display_decimals(TokenKind::Internal)),
                native: s.native.map(|n| n.to_fixed(4)),
                stale: s.stale.clone(),
                as_of: s.as_of,
            });

        EngineView {
            account_short: session.account().map(|a| short_address(&a)),
            explorer_link: session.account().map(|a| explorer_link(&self.explorer_url, &a)),
            balances,
            direction,
            input_symbol: self.symbol(direction.input_token()).to_string(),
            output_symbol: self.symbol(direction.output_token()).to_string(),
            output_display: state
                .quote
                .output
                .to_fixed(self.display_decimals(direction.output_token())),
            rate: self.rate.describe(
                direction,
                &self.tokens.external_symbol,
                &self.tokens.internal_symbol,
            ),
            raw_input: state.raw_input,
            quote: state.quote,
            phase: state.phase,
            busy: state.busy,
            last_error: state.last_error,
            last_transaction: state.last_transaction.and_then(|id| self.transaction(&id)),
            session,
        }
    }

    /// React to session events outside of an exchange.
    ///
    /// A running exchange watches events itself; this loop only drops the
    /// pending intent when the wallet disconnects.
    pub async fn run(
        self: Arc<Self>,
        mut events: broadcast::Receiver<SessionEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(SessionEvent::Disconnected { .. }) => {
                        let mut state = self.state.write().await;
                        if !state.busy {
                            state.reset_intent();
                            tracing::debug!("Wallet disconnected, intent cleared");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Engine lagged behind session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Exchange engine received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for ExchangeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeEngine")
            .field("rate", &self.rate)
            .field("history", &self.history.len())
            .finish()
    }
}

/// Await `step` unless an invalidating session event arrives first.
///
/// Events already queued win over a step that is ready in the same poll.
async fn preemptible<T, F>(
    events: &mut broadcast::Receiver<SessionEvent>,
    phase: Phase,
    step: F,
) -> Result<T, ExchangeError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::select! {
        biased;
        reason = next_invalidation(events) => Err(ExchangeError::SessionInvalidated { reason }),
        result = step => result.map_err(|source| ExchangeError::Gateway { phase, source }),
    }
}

async fn next_invalidation(events: &mut broadcast::Receiver<SessionEvent>) -> String {
    loop {
        match events.recv().await {
            Ok(event) if event.invalidates_exchange() => return event.to_string(),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                return format!("missed {} session events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => return std::future::pending().await,
        }
    }
}
