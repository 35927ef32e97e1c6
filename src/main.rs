//! Token exchange daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!   HTTP API      │                   TOKEN EXCHANGE                      │
//!   ──────────────┼─▶ http ──▶ ExchangeEngine ──▶ ContractGateway ──────┼──▶ JSON-RPC node
//!                 │                 │    ▲              ▲                │      (tokens,
//!                 │                 │    │ events       │ reads          │       exchange)
//!                 │                 ▼    │              │                │
//!                 │      BalanceSynchronizer ◀── ProviderSession ◀──────┼─── SigningProvider
//!                 │                          events     (ArcSwap)        │    (local key,
//!                 │                                                      │     network watcher)
//!                 │  config · observability · lifecycle                  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use token_exchange::balances::BalanceSynchronizer;
use token_exchange::blockchain::{RpcSigningProvider, SigningProvider, Wallet};
use token_exchange::config::{load_config, ExchangeConfig};
use token_exchange::contracts::{ConfirmationPolicy, ContractGateway};
use token_exchange::http::ApiServer;
use token_exchange::lifecycle::{signals, Shutdown};
use token_exchange::observability::{logging, metrics};
use token_exchange::session::ProviderSession;
use token_exchange::ExchangeEngine;

#[derive(Parser)]
#[command(name = "token-exchange")]
#[command(about = "Wallet session and token exchange daemon", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "exchange.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "token-exchange starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let provider = build_provider(&config, &shutdown)?;

    let session = ProviderSession::new(provider.clone());
    let gateway = ContractGateway::new(
        provider,
        config.contracts.clone(),
        ConfirmationPolicy::from(&config.confirmation),
    );
    let balances = BalanceSynchronizer::new(session.clone(), gateway.clone());
    let engine = Arc::new(
        ExchangeEngine::new(session.clone(), gateway, balances.clone())
            .with_display(config.tokens.clone(), config.provider.explorer_url.clone()),
    );

    // Subscribe before resuming so the resumed session is seen by both loops.
    tokio::spawn(balances.run(session.subscribe(), shutdown.subscribe()));
    tokio::spawn(engine.clone().run(session.subscribe(), shutdown.subscribe()));

    match session.try_resume().await {
        Some(resumed) => tracing::info!(account = ?resumed.account(), "Session resumed"),
        None => tracing::info!("No authorized account, waiting for connect"),
    }

    let api = if config.api.enabled {
        let listener = TcpListener::bind(&config.api.bind_address).await?;
        let server = ApiServer::new(engine.clone());
        Some(tokio::spawn(server.run(listener, shutdown.subscribe())))
    } else {
        tracing::info!("API disabled");
        None
    };

    signals::trigger_on_ctrl_c(&shutdown).await;

    if let Some(api) = api {
        match api.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "API server error"),
            Err(e) => tracing::error!(error = %e, "API task panicked"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// The signing provider, or `None` when disabled or no key is configured.
fn build_provider(
    config: &ExchangeConfig,
    shutdown: &Shutdown,
) -> Result<Option<Arc<dyn SigningProvider>>, Box<dyn std::error::Error>> {
    if !config.provider.enabled {
        tracing::warn!("Signing provider disabled, connect will report no provider");
        return Ok(None);
    }

    let Some(wallet) = Wallet::from_env(config.provider.chain_id)? else {
        tracing::warn!(
            env_var = token_exchange::blockchain::wallet::PRIVATE_KEY_ENV_VAR,
            "No private key in environment, connect will report no provider"
        );
        return Ok(None);
    };

    let provider = Arc::new(RpcSigningProvider::new(config.provider.clone(), wallet)?);
    tokio::spawn(provider.clone().watch_network(shutdown.subscribe()));
    Ok(Some(provider as Arc<dyn SigningProvider>))
}
