//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Listener Defaults
// ============================================================================

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
/// Default maximum HTTP header bytes accepted before the upgrade.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8192;
/// Smallest accepted header limit.
pub const MIN_HEADER_BYTES: usize = 512;
/// Default TCP listener backlog.
pub const DEFAULT_CONNECTION_BACKLOG: u32 = 1024;
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Buffer/Size Defaults
// ============================================================================

/// Default relay buffer size for outbound reads (32 KiB).
pub const DEFAULT_RELAY_BUFFER_SIZE: usize = 32768;
/// Minimum accepted relay buffer size.
pub const MIN_RELAY_BUFFER_SIZE: usize = 1024;
/// Maximum accepted relay buffer size.
pub const MAX_RELAY_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// WebSocket Defaults
// ============================================================================

/// Default WebSocket path.
pub const DEFAULT_WS_PATH: &str = "/";
/// Default max WebSocket frame size.
pub const DEFAULT_WS_MAX_FRAME_BYTES: usize = 1 << 20;
/// Whether an upgrade-time token is required by default.
pub const DEFAULT_WS_REQUIRE_TOKEN: bool = false;
/// Close code sent on normal teardown.
pub const WS_CLOSE_NORMAL: u16 = 1000;
/// Close reason sent on normal teardown.
pub const WS_CLOSE_REASON: &str = "Server closed";

// ============================================================================
// Outbound Defaults
// ============================================================================

/// Default connect timeout in seconds (0 = rely on the OS).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 0;
/// Default TCP_NODELAY for outbound sockets.
pub const DEFAULT_TCP_NO_DELAY: bool = true;
/// Default TCP socket send buffer size (0 = OS default).
pub const DEFAULT_TCP_SEND_BUFFER: usize = 0;
/// Default TCP socket receive buffer size (0 = OS default).
pub const DEFAULT_TCP_RECV_BUFFER: usize = 0;
/// I/O error kinds treated as connectivity failures eligible for fallback.
pub const DEFAULT_RETRY_ERROR_KINDS: &[&str] = &[
    "connection_refused",
    "connection_reset",
    "connection_aborted",
    "timed_out",
    "host_unreachable",
    "network_unreachable",
];
/// Error message fragments treated as connectivity failures eligible for fallback.
pub const DEFAULT_RETRY_MESSAGES: &[&str] = &["proxy request", "cannot connect", "cloudflare"];

// ============================================================================
// Token Directory Defaults
// ============================================================================

/// Default TTL of the remote token document cache in seconds.
pub const DEFAULT_TOKEN_CACHE_TTL_SECS: u64 = 60;
/// Default HTTP timeout when fetching the remote token document.
pub const DEFAULT_TOKEN_FETCH_TIMEOUT_SECS: u64 = 10;
/// User agent used when fetching the remote token document.
pub const TOKEN_FETCH_USER_AGENT: &str = "edgerelay-auth";
