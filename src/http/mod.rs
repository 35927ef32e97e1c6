//! Presentation API subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request → server.rs (router, tracing) → handlers.rs
//!     → ExchangeEngine command or view
//!     → JSON body, or error.rs {kind, message, engine_initiated}
//! ```

pub mod error;
pub mod handlers;
pub mod server;

pub use server::{build_router, ApiServer, AppState};
