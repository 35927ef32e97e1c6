//! Metrics collection and exposition.
//!
//! # Metrics
//! - `exchange_attempts_total` (counter): execute commands accepted
//! - `exchange_outcomes_total` (counter): by direction and outcome kind
//! - `gateway_calls_total` (counter): gateway operations by op and result
//! - `balance_refreshes_total` (counter): completed balance refreshes
//! - `session_events_total` (counter): session events by name
//! - `confirmation_wait_seconds` (histogram): time from submit to receipt

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_exchange_attempt() {
    ::metrics::counter!("exchange_attempts_total").increment(1);
}

pub fn record_exchange_outcome(direction: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "exchange_outcomes_total",
        "direction" => direction,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_gateway_call(op: &'static str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("gateway_calls_total", "op" => op, "result" => result).increment(1);
}

pub fn record_balance_refresh() {
    ::metrics::counter!("balance_refreshes_total").increment(1);
}

pub fn record_session_event(event: &'static str) {
    ::metrics::counter!("session_events_total", "event" => event).increment(1);
}

pub fn record_confirmation_wait(elapsed: Duration) {
    ::metrics::histogram!("confirmation_wait_seconds").record(elapsed.as_secs_f64());
}
