//! WebSocket upgrade gate.
//!
//! The HTTP request head is read off the raw socket and inspected before any
//! handshake happens, so non-upgrade traffic and mismatched paths get a plain
//! HTTP answer. Accepted requests are replayed into the handshake through a
//! [`PrefixedStream`].

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::{
    WebSocketStream, accept_hdr_async_with_config,
    tungstenite::{
        handshake::server::{Request, Response},
        http::header::SEC_WEBSOCKET_PROTOCOL,
        protocol::WebSocketConfig,
    },
};
use tracing::{debug, warn};

use edgerelay_config::WebSocketConfig as WsCfg;
use edgerelay_core::io::PrefixedStream;
use edgerelay_metrics::record_connection_rejected;

use crate::error::ServerError;
use crate::state::ServerState;

/// Initial buffer size for reading the HTTP request head.
pub const INITIAL_BUFFER_SIZE: usize = 2048;

const HTTP_HEADER_END: &[u8] = b"\r\n\r\n";

/// Result of inspecting a buffered request head.
#[derive(Debug, PartialEq, Eq)]
pub enum Inspect {
    /// Blank line not seen yet.
    NeedMore,
    NotHttp,
    /// HTTP, but not a WebSocket upgrade.
    NotWebSocket,
    /// Upgrade for another path or host.
    Mismatch(&'static str),
    Upgrade {
        /// Raw `Sec-WebSocket-Protocol` value.
        protocol: Option<String>,
    },
}

/// Classifies the request head buffered so far.
pub fn inspect_request(buf: &[u8], cfg: &WsCfg) -> Inspect {
    let Some(header_end) = find_header_end(buf) else {
        return Inspect::NeedMore;
    };
    let Ok(head) = std::str::from_utf8(&buf[..header_end]) else {
        return Inspect::NotHttp;
    };
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Inspect::NotHttp;
    }
    if method != "GET" {
        return Inspect::NotWebSocket;
    }

    let mut upgrade = false;
    let mut connection_upgrade = false;
    let mut ws_key = false;
    let mut host: Option<&str> = None;
    let mut protocol: Option<&str> = None;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "upgrade" => upgrade |= value.to_ascii_lowercase().contains("websocket"),
            "connection" => connection_upgrade |= value.to_ascii_lowercase().contains("upgrade"),
            "sec-websocket-key" => ws_key |= !value.is_empty(),
            "sec-websocket-protocol" if !value.is_empty() => protocol = Some(value),
            "host" => host = Some(value),
            _ => {}
        }
    }

    if !upgrade || !connection_upgrade || !ws_key {
        return Inspect::NotWebSocket;
    }
    if !path_matches(cfg, path) {
        return Inspect::Mismatch("websocket path mismatch");
    }
    if !host_matches(cfg, host) {
        return Inspect::Mismatch("websocket host mismatch");
    }
    Inspect::Upgrade {
        protocol: protocol.map(str::to_string),
    }
}

/// Runs the gate on a fresh connection.
///
/// Returns `Ok(None)` when the request was answered with an HTTP error (or
/// the peer went away) and no session should start.
pub async fn accept<S>(
    mut stream: S,
    state: &ServerState,
    peer: SocketAddr,
) -> Result<Option<WebSocketStream<PrefixedStream<S>>>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUFFER_SIZE);
    let protocol = loop {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            debug!(peer = %peer, "connection closed before request head");
            return Ok(None);
        }
        let head_len = find_header_end(&buf).unwrap_or(buf.len());
        if head_len > state.max_header_bytes {
            warn!(peer = %peer, bytes = head_len, max = state.max_header_bytes, "request head too large");
            reject(&mut stream, Rejection::BadRequest, "bad_request").await?;
            return Ok(None);
        }
        match inspect_request(&buf, &state.websocket) {
            Inspect::NeedMore => {}
            Inspect::NotHttp => {
                debug!(peer = %peer, "not an HTTP request");
                reject(&mut stream, Rejection::BadRequest, "bad_request").await?;
                return Ok(None);
            }
            Inspect::NotWebSocket => {
                debug!(peer = %peer, "plain HTTP request");
                reject(&mut stream, Rejection::UpgradeRequired, "not_websocket").await?;
                return Ok(None);
            }
            Inspect::Mismatch(reason) => {
                debug!(peer = %peer, reason, "upgrade rejected");
                reject(&mut stream, Rejection::BadRequest, "bad_request").await?;
                return Ok(None);
            }
            Inspect::Upgrade { protocol } => break protocol,
        }
    };

    if state.websocket.require_token {
        let Some(token) = protocol.as_deref() else {
            debug!(peer = %peer, "upgrade without token");
            reject(&mut stream, Rejection::TokenRequired, "unauthorized").await?;
            return Ok(None);
        };
        let valid = match state.directory.resolve(token, OffsetDateTime::now_utc()).await {
            Ok(resolution) => resolution.is_valid(),
            Err(e) => {
                warn!(peer = %peer, error = %e, "token directory unavailable");
                false
            }
        };
        if !valid {
            debug!(peer = %peer, "upgrade token rejected");
            reject(&mut stream, Rejection::TokenInvalid, "unauthorized").await?;
            return Ok(None);
        }
    }

    let ws = handshake(stream, buf.freeze(), &state.websocket).await?;
    debug!(peer = %peer, "websocket established");
    Ok(Some(ws))
}

/// Completes the handshake, echoing the requested subprotocol.
pub async fn handshake<S>(
    stream: S,
    initial: Bytes,
    cfg: &WsCfg,
) -> Result<WebSocketStream<PrefixedStream<S>>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let limit = (cfg.max_frame_bytes > 0).then_some(cfg.max_frame_bytes);
    let ws_cfg = WebSocketConfig {
        max_frame_size: limit,
        max_message_size: limit,
        ..WebSocketConfig::default()
    };
    let prefixed = PrefixedStream::new(initial, stream);
    accept_hdr_async_with_config(
        prefixed,
        |req: &Request, mut resp: Response| {
            if let Some(protocol) = req.headers().get(SEC_WEBSOCKET_PROTOCOL) {
                resp.headers_mut()
                    .insert(SEC_WEBSOCKET_PROTOCOL, protocol.clone());
            }
            Ok(resp)
        },
        Some(ws_cfg),
    )
    .await
    .map_err(|e| ServerError::Handshake(e.to_string()))
}

/// HTTP answers sent instead of an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BadRequest,
    UpgradeRequired,
    TokenRequired,
    TokenInvalid,
}

impl Rejection {
    fn response(self) -> &'static [u8] {
        match self {
            Rejection::BadRequest => {
                b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            }
            Rejection::UpgradeRequired => {
                b"HTTP/1.1 426 Upgrade Required\r\nContent-Type: text/plain\r\nContent-Length: 18\r\nConnection: close\r\n\r\nExpected WebSocket"
            }
            Rejection::TokenRequired => {
                b"HTTP/1.1 401 Unauthorized\r\nContent-Type: text/plain\r\nContent-Length: 29\r\nConnection: close\r\n\r\nUnauthorized - Token Required"
            }
            Rejection::TokenInvalid => {
                b"HTTP/1.1 401 Unauthorized\r\nContent-Type: text/plain\r\nContent-Length: 29\r\nConnection: close\r\n\r\nUnauthorized or Token Expired"
            }
        }
    }
}

async fn reject<S>(stream: &mut S, rejection: Rejection, reason: &'static str) -> Result<(), ServerError>
where
    S: AsyncWrite + Unpin,
{
    record_connection_rejected(reason);
    stream.write_all(rejection.response()).await?;
    stream.shutdown().await?;
    Ok(())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HTTP_HEADER_END.len())
        .position(|w| w == HTTP_HEADER_END)
        .map(|idx| idx + HTTP_HEADER_END.len())
}

fn path_matches(cfg: &WsCfg, path: &str) -> bool {
    let path_only = path.split('?').next().unwrap_or("");
    path_only == cfg.path
}

fn host_matches(cfg: &WsCfg, host: Option<&str>) -> bool {
    let Some(expected) = cfg.host.as_deref() else {
        return true;
    };
    let Some(host) = host else {
        return false;
    };
    strip_port(host).eq_ignore_ascii_case(expected)
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}
