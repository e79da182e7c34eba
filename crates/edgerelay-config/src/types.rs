//! Configuration type definitions for server, WebSocket, auth, outbound,
//! metrics, and logging.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub outbound: OutboundConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Maximum concurrent connections (None = unlimited)
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Maximum bytes of the HTTP upgrade request head.
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
    /// Read buffer for outbound-to-client relaying (bytes).
    #[serde(default = "default_relay_buffer_size")]
    pub relay_buffer_size: usize,
    /// TCP listener backlog (pending connections queue size).
    #[serde(default = "default_connection_backlog")]
    pub connection_backlog: u32,
    /// How long to wait for active sessions on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_connections: None,
            max_header_bytes: default_max_header_bytes(),
            relay_buffer_size: default_relay_buffer_size(),
            connection_backlog: default_connection_backlog(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ws_path")]
    pub path: String,
    /// Required `Host` header value, if set.
    #[serde(default)]
    pub host: Option<String>,
    /// Frame and message size limit (0 = unlimited).
    #[serde(default = "default_ws_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Require a valid token in `Sec-WebSocket-Protocol` before upgrading.
    #[serde(default = "default_ws_require_token")]
    pub require_token: bool,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            path: default_ws_path(),
            host: None,
            max_frame_bytes: default_ws_max_frame_bytes(),
            require_token: default_ws_require_token(),
        }
    }
}

/// Token sources. Inline tokens and the token file form the local document;
/// when `remote` is set the local document is its fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
    /// Path to a JSON token document.
    #[serde(default)]
    pub token_file: Option<String>,
    #[serde(default)]
    pub remote: Option<RemoteAuthConfig>,
}

impl AuthConfig {
    pub fn has_source(&self) -> bool {
        !self.tokens.is_empty() || self.token_file.is_some() || self.remote.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    /// RFC 3339 expiry; absent = never expires.
    #[serde(default)]
    pub expire: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl TokenEntry {
    pub fn permanent(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expire: None,
            remark: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAuthConfig {
    /// Token document URL. GitHub page URLs are rewritten to raw content.
    pub url: String,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default = "default_token_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_token_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl RemoteAuthConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            github_token: None,
            cache_ttl_secs: default_token_cache_ttl_secs(),
            timeout_secs: default_token_fetch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundConfig {
    /// Hosts tried, in order, after the destination itself fails with a
    /// retryable error. The destination port is reused.
    #[serde(default)]
    pub fallback_hosts: Vec<String>,
    /// Per-attempt connect bound in seconds (0 = rely on the OS).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub tcp: TcpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            fallback_hosts: Vec::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            tcp: TcpConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Outbound TCP socket options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm (TCP_NODELAY).
    #[serde(default = "default_tcp_no_delay")]
    pub no_delay: bool,
    /// SO_SNDBUF. If 0, uses OS default.
    #[serde(default = "default_tcp_send_buffer")]
    pub send_buffer: usize,
    /// SO_RCVBUF. If 0, uses OS default.
    #[serde(default = "default_tcp_recv_buffer")]
    pub recv_buffer: usize,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            no_delay: default_tcp_no_delay(),
            send_buffer: default_tcp_send_buffer(),
            recv_buffer: default_tcp_recv_buffer(),
        }
    }
}

/// Which connect failures move on to the next fallback host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// `io::ErrorKind` names in snake_case, e.g. `connection_refused`.
    #[serde(default = "default_retry_error_kinds")]
    pub error_kinds: Vec<String>,
    /// Case-insensitive substrings of the error message.
    #[serde(default = "default_retry_messages")]
    pub messages: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            error_kinds: default_retry_error_kinds(),
            messages: default_retry_messages(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus exporter listen address; disabled when unset.
    pub listen: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Output target: stdout or stderr. Default: stderr.
    pub output: Option<String>,
    /// Per-module log level filters (e.g., {"edgerelay_auth": "debug", "reqwest": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}
