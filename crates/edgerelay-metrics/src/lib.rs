//! Metrics collection and Prometheus exporter for edgerelay.
//!
//! Session counts by protocol, upgrade rejections, authorization outcomes,
//! outbound connect attempts and relayed bytes.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Returns an error message if binding fails.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total number of TCP connections accepted.
pub const CONNECTIONS_TOTAL: &str = "edgerelay_connections_total";
/// Number of currently active connections.
pub const CONNECTIONS_ACTIVE: &str = "edgerelay_connections_active";
/// Total number of connections rejected before upgrade, by reason.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "edgerelay_connections_rejected_total";
/// Connection duration histogram (seconds).
pub const CONNECTION_DURATION_SECONDS: &str = "edgerelay_connection_duration_seconds";
/// Sessions committed to a protocol ("binary" or "text").
pub const SESSIONS_TOTAL: &str = "edgerelay_sessions_total";
/// Total number of successful authorizations.
pub const AUTH_SUCCESS_TOTAL: &str = "edgerelay_auth_success_total";
/// Total number of failed authorizations, by status.
pub const AUTH_FAILURE_TOTAL: &str = "edgerelay_auth_failure_total";
/// Outbound connect attempts, by result ("ok", "retryable", "terminal").
pub const CONNECT_ATTEMPTS_TOTAL: &str = "edgerelay_connect_attempts_total";
/// Sessions that reached the relay only through a fallback endpoint.
pub const FALLBACK_CONNECTS_TOTAL: &str = "edgerelay_fallback_connects_total";
/// Total bytes forwarded from clients to destinations.
pub const BYTES_UPSTREAM_TOTAL: &str = "edgerelay_bytes_upstream_total";
/// Total bytes forwarded from destinations to clients.
pub const BYTES_DOWNSTREAM_TOTAL: &str = "edgerelay_bytes_downstream_total";
/// Total number of errors by type.
pub const ERRORS_TOTAL: &str = "edgerelay_errors_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a new connection accepted.
#[inline]
pub fn record_connection_accepted() {
    counter!(CONNECTIONS_TOTAL).increment(1);
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a connection closed.
#[inline]
pub fn record_connection_closed(duration_secs: f64) {
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(CONNECTION_DURATION_SECONDS).record(duration_secs);
}

/// Record a rejected connection (reason: "max_connections", "bad_request",
/// "not_websocket", "unauthorized").
#[inline]
pub fn record_connection_rejected(reason: &'static str) {
    counter!(CONNECTIONS_REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Record the protocol a session committed to.
#[inline]
pub fn record_session(protocol: &'static str) {
    counter!(SESSIONS_TOTAL, "protocol" => protocol).increment(1);
}

#[inline]
pub fn record_auth_success() {
    counter!(AUTH_SUCCESS_TOTAL).increment(1);
}

/// Record failed authorization (status: "expired", "not_found", "backend").
#[inline]
pub fn record_auth_failure(status: &'static str) {
    counter!(AUTH_FAILURE_TOTAL, "status" => status).increment(1);
}

/// Record one outbound connect attempt.
#[inline]
pub fn record_connect_attempt(result: &'static str) {
    counter!(CONNECT_ATTEMPTS_TOTAL, "result" => result).increment(1);
}

#[inline]
pub fn record_fallback_connect() {
    counter!(FALLBACK_CONNECTS_TOTAL).increment(1);
}

#[inline]
pub fn record_bytes_upstream(bytes: u64) {
    counter!(BYTES_UPSTREAM_TOTAL).increment(bytes);
}

#[inline]
pub fn record_bytes_downstream(bytes: u64) {
    counter!(BYTES_DOWNSTREAM_TOTAL).increment(bytes);
}

/// Record an error by type.
#[inline]
pub fn record_error(error_type: &'static str) {
    counter!(ERRORS_TOTAL, "type" => error_type).increment(1);
}

// ============================================================================
// Error Type Constants (re-exported from edgerelay-core)
// ============================================================================

pub use edgerelay_core::{
    ERROR_AUTH, ERROR_CONFIG, ERROR_CONNECT, ERROR_HANDSHAKE, ERROR_IO, ERROR_PROTOCOL,
    ERROR_TIMEOUT,
};
