//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up request tracing
//! - Serve until the shutdown signal fires

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::exchange::ExchangeEngine;
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ExchangeEngine>,
}

/// The presentation API in front of one exchange engine.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new(engine: Arc<ExchangeEngine>) -> Self {
        Self {
            router: build_router(AppState { engine }),
        }
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
        .route("/intent", post(handlers::set_intent))
        .route("/intent/max", post(handlers::set_max))
        .route("/intent/toggle", post(handlers::toggle_direction))
        .route("/execute", post(handlers::execute))
        .route("/transactions/{id}", get(handlers::get_transaction))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
