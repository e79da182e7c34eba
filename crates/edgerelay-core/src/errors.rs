//! Error type constants for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// WebSocket upgrade / handshake error.
pub const ERROR_HANDSHAKE: &str = "handshake";
/// Protocol parsing/validation error.
pub const ERROR_PROTOCOL: &str = "protocol";
/// I/O error.
pub const ERROR_IO: &str = "io";
/// Outbound connect error (all endpoints failed or terminal failure).
pub const ERROR_CONNECT: &str = "connect";
/// Timeout error.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Authentication error.
pub const ERROR_AUTH: &str = "auth";
/// Configuration error.
pub const ERROR_CONFIG: &str = "config";
