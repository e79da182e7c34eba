//! CLI override definitions and application logic.

use clap::Parser;

use crate::Config;
use crate::types::*;

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override server listen address, e.g. 0.0.0.0:8080
    #[arg(long)]
    pub listen: Option<String>,
    /// Override maximum concurrent connections (0 = unlimited)
    #[arg(long)]
    pub max_connections: Option<usize>,
    /// Override maximum HTTP upgrade header bytes
    #[arg(long)]
    pub max_header_bytes: Option<usize>,
    /// Buffer size for outbound relay reads (bytes)
    #[arg(long)]
    pub relay_buffer_size: Option<usize>,
    /// TCP listener backlog size
    #[arg(long)]
    pub connection_backlog: Option<u32>,
    /// Graceful shutdown timeout (seconds)
    #[arg(long)]
    pub shutdown_timeout_secs: Option<u64>,
    /// WebSocket path
    #[arg(long)]
    pub ws_path: Option<String>,
    /// Required WebSocket Host header
    #[arg(long)]
    pub ws_host: Option<String>,
    /// WebSocket max frame bytes (0 = unlimited)
    #[arg(long)]
    pub ws_max_frame_bytes: Option<usize>,
    /// Require a valid token in Sec-WebSocket-Protocol before upgrading
    #[arg(long)]
    pub require_token: Option<bool>,
    /// Add a permanent token (repeatable or comma-separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub token: Option<Vec<String>>,
    /// Override token document file
    #[arg(long)]
    pub token_file: Option<String>,
    /// Override remote token document URL
    #[arg(long)]
    pub token_url: Option<String>,
    /// GitHub token used to fetch the remote token document
    #[arg(long, env = "EDGERELAY_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
    /// Override fallback hosts (repeatable or comma-separated)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub fallback_host: Option<Vec<String>>,
    /// Per-attempt outbound connect timeout (seconds, 0 = OS default)
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,
    /// TCP socket send buffer size (SO_SNDBUF, 0 = OS default)
    #[arg(long)]
    pub tcp_send_buffer: Option<usize>,
    /// TCP socket receive buffer size (SO_RCVBUF, 0 = OS default)
    #[arg(long)]
    pub tcp_recv_buffer: Option<usize>,
    /// Override metrics listen address
    #[arg(long)]
    pub metrics_listen: Option<String>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override log format (pretty/json/compact)
    #[arg(long)]
    pub log_format: Option<String>,
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = overrides.max_connections {
        config.server.max_connections = if v == 0 { None } else { Some(v) };
    }
    if let Some(v) = overrides.max_header_bytes {
        config.server.max_header_bytes = v;
    }
    if let Some(v) = overrides.relay_buffer_size {
        config.server.relay_buffer_size = v;
    }
    if let Some(v) = overrides.connection_backlog {
        config.server.connection_backlog = v;
    }
    if let Some(v) = overrides.shutdown_timeout_secs {
        config.server.shutdown_timeout_secs = v;
    }
    if let Some(v) = &overrides.ws_path {
        config.websocket.path = v.clone();
    }
    if let Some(v) = &overrides.ws_host {
        config.websocket.host = Some(v.clone());
    }
    if let Some(v) = overrides.ws_max_frame_bytes {
        config.websocket.max_frame_bytes = v;
    }
    if let Some(v) = overrides.require_token {
        config.websocket.require_token = v;
    }
    if let Some(tokens) = &overrides.token {
        config
            .auth
            .tokens
            .extend(tokens.iter().map(TokenEntry::permanent));
    }
    if let Some(v) = &overrides.token_file {
        config.auth.token_file = Some(v.clone());
    }
    if let Some(url) = &overrides.token_url {
        match config.auth.remote.as_mut() {
            Some(remote) => remote.url = url.clone(),
            None => config.auth.remote = Some(RemoteAuthConfig::new(url.clone())),
        }
    }
    if let Some(v) = &overrides.github_token
        && let Some(remote) = config.auth.remote.as_mut()
    {
        remote.github_token = Some(v.clone());
    }
    if let Some(v) = &overrides.fallback_host {
        config.outbound.fallback_hosts = v.clone();
    }
    if let Some(v) = overrides.connect_timeout_secs {
        config.outbound.connect_timeout_secs = v;
    }
    if let Some(v) = overrides.tcp_send_buffer {
        config.outbound.tcp.send_buffer = v;
    }
    if let Some(v) = overrides.tcp_recv_buffer {
        config.outbound.tcp.recv_buffer = v;
    }
    if let Some(v) = &overrides.metrics_listen {
        config.metrics.listen = Some(v.clone());
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = Some(v.clone());
    }
}
