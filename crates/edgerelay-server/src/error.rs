//! Server error types.

use edgerelay_auth::AuthError;
use edgerelay_metrics::{
    ERROR_AUTH, ERROR_CONFIG, ERROR_CONNECT, ERROR_HANDSHAKE, ERROR_IO, ERROR_PROTOCOL, ERROR_TIMEOUT,
};
use edgerelay_proto::{ParseError, TargetError};
use tokio_tungstenite::tungstenite;

use crate::outbound::ConnectError;

/// Server error type. Session errors end at the per-connection task.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("websocket: {0}")]
    Ws(#[from] tungstenite::Error),
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("config: {0}")]
    Config(String),
    #[error("invalid header: {0}")]
    Proto(#[from] ParseError),
    #[error("truncated header")]
    Truncated,
    #[error("{0}")]
    Target(#[from] TargetError),
    #[error("already connected")]
    AlreadyConnected,
    #[error("{0}")]
    Connect(#[from] ConnectError),
}

impl ServerError {
    /// Get the error type string for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            ServerError::Io(_) | ServerError::Ws(_) => ERROR_IO,
            ServerError::Handshake(_) => ERROR_HANDSHAKE,
            ServerError::Auth(_) => ERROR_AUTH,
            ServerError::Config(_) => ERROR_CONFIG,
            ServerError::Proto(_)
            | ServerError::Truncated
            | ServerError::Target(_)
            | ServerError::AlreadyConnected => ERROR_PROTOCOL,
            ServerError::Connect(e) if e.timed_out() => ERROR_TIMEOUT,
            ServerError::Connect(_) => ERROR_CONNECT,
        }
    }
}
