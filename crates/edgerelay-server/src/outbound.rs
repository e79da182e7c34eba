//! Outbound connector.
//!
//! Every session dials its destination through [`OutboundConnector`]. The
//! endpoint list is the decoded destination followed by the configured
//! fallback hosts on the same port, tried strictly in order, one at a time.
//! Whether a failure moves on to the next endpoint is decided by a single
//! [`RetryPolicy`].

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tracing::{debug, warn};

use edgerelay_config::{OutboundConfig, RetryConfig, TcpConfig};
use edgerelay_core::io::{error_kind_from_name, error_kind_name};
use edgerelay_metrics::{record_connect_attempt, record_fallback_connect};
use edgerelay_proto::Destination;

/// Byte stream returned by a [`Dialer`].
pub trait OutboundIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> OutboundIo for T {}

pub type OutboundStream = Box<dyn OutboundIo>;

/// A candidate `(host, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl From<&Destination> for Endpoint {
    fn from(dest: &Destination) -> Self {
        Self::new(dest.host.clone(), dest.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Opens raw byte streams to endpoints.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, endpoint: &Endpoint) -> io::Result<OutboundStream>;
}

/// Plain TCP dialer.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    tcp: TcpConfig,
    /// `None` leaves the bound to the OS.
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    pub fn new(tcp: TcpConfig, connect_timeout: Option<Duration>) -> Self {
        Self {
            tcp,
            connect_timeout,
        }
    }

    pub fn from_config(cfg: &OutboundConfig) -> Self {
        let timeout = (cfg.connect_timeout_secs > 0)
            .then(|| Duration::from_secs(cfg.connect_timeout_secs));
        Self::new(cfg.tcp.clone(), timeout)
    }

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port)).await? {
            match self.connect_addr(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(endpoint = %endpoint, addr = %addr, error = %e, "address failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot connect: no addresses for {endpoint}"),
            )
        }))
    }

    async fn connect_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if self.tcp.send_buffer > 0 {
            socket.set_send_buffer_size(self.tcp.send_buffer as u32)?;
        }
        if self.tcp.recv_buffer > 0 {
            socket.set_recv_buffer_size(self.tcp.recv_buffer as u32)?;
        }
        let stream = socket.connect(addr).await?;
        if self.tcp.no_delay {
            stream.set_nodelay(true)?;
        }
        Ok(stream)
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, endpoint: &Endpoint) -> io::Result<OutboundStream> {
        let stream = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connect(endpoint))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connect to {endpoint} timed out after {}s", limit.as_secs()),
                    )
                })??,
            None => self.connect(endpoint).await?,
        };
        Ok(Box::new(stream))
    }
}

/// Decides which connect failures are worth the next endpoint.
///
/// An error is retryable when its kind is listed, or when its message
/// contains one of the patterns (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    kinds: Vec<io::ErrorKind>,
    messages: Vec<String>,
}

impl RetryPolicy {
    pub fn new(kinds: Vec<io::ErrorKind>, messages: impl IntoIterator<Item = String>) -> Self {
        Self {
            kinds,
            messages: messages.into_iter().map(|m| m.to_ascii_lowercase()).collect(),
        }
    }

    /// Unknown kind names are skipped; config validation rejects them first.
    pub fn from_config(cfg: &RetryConfig) -> Self {
        let kinds = cfg
            .error_kinds
            .iter()
            .filter_map(|name| error_kind_from_name(name))
            .collect();
        Self::new(kinds, cfg.messages.iter().cloned())
    }

    pub fn is_retryable(&self, err: &io::Error) -> bool {
        if self.kinds.contains(&err.kind()) {
            return true;
        }
        if self.messages.is_empty() {
            return false;
        }
        let text = err.to_string().to_ascii_lowercase();
        self.messages.iter().any(|m| text.contains(m.as_str()))
    }
}

/// One failed attempt.
#[derive(Debug)]
pub struct ConnectionAttempt {
    pub endpoint: Endpoint,
    pub error: io::Error,
    pub retryable: bool,
}

/// Every attempt failed, or one failed terminally.
#[derive(Debug)]
pub struct ConnectError {
    pub attempts: Vec<ConnectionAttempt>,
}

impl ConnectError {
    pub fn last(&self) -> Option<&ConnectionAttempt> {
        self.attempts.last()
    }

    pub fn timed_out(&self) -> bool {
        self.last()
            .is_some_and(|a| a.error.kind() == io::ErrorKind::TimedOut)
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            Some(last) => write!(
                f,
                "connect failed after {} attempt(s): {}: {}",
                self.attempts.len(),
                last.endpoint,
                last.error
            ),
            None => f.write_str("connect failed: no endpoints"),
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last().map(|a| &a.error as &(dyn std::error::Error + 'static))
    }
}

/// An open outbound stream with the inline payload already written.
pub struct Connected {
    pub stream: OutboundStream,
    pub endpoint: Endpoint,
    /// Zero when the destination itself answered.
    pub index: usize,
}

/// Dials a destination, falling back to configured hosts.
pub struct OutboundConnector {
    dialer: Arc<dyn Dialer>,
    fallback_hosts: Vec<String>,
    policy: RetryPolicy,
}

impl OutboundConnector {
    pub fn new(dialer: Arc<dyn Dialer>, fallback_hosts: Vec<String>, policy: RetryPolicy) -> Self {
        Self {
            dialer,
            fallback_hosts,
            policy,
        }
    }

    pub fn from_config(cfg: &OutboundConfig) -> Self {
        Self::new(
            Arc::new(TcpDialer::from_config(cfg)),
            cfg.fallback_hosts.clone(),
            RetryPolicy::from_config(&cfg.retry),
        )
    }

    #[inline]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The destination first, then each fallback host on the same port.
    pub fn endpoints(&self, dest: &Destination) -> Vec<Endpoint> {
        std::iter::once(Endpoint::from(dest))
            .chain(
                self.fallback_hosts
                    .iter()
                    .map(|host| Endpoint::new(host.clone(), dest.port)),
            )
            .collect()
    }

    /// Connects and writes `payload`. Stops at the first non-retryable
    /// failure even if endpoints remain.
    pub async fn connect(&self, dest: &Destination, payload: &[u8]) -> Result<Connected, ConnectError> {
        let endpoints = self.endpoints(dest);
        let total = endpoints.len();
        let mut attempts = Vec::new();

        for (index, endpoint) in endpoints.into_iter().enumerate() {
            match self.attempt(&endpoint, payload).await {
                Ok(stream) => {
                    record_connect_attempt("ok");
                    if index > 0 {
                        record_fallback_connect();
                    }
                    debug!(dest = %dest, endpoint = %endpoint, attempt = index + 1, "outbound connected");
                    return Ok(Connected {
                        stream,
                        endpoint,
                        index,
                    });
                }
                Err(error) => {
                    let retryable = self.policy.is_retryable(&error);
                    let remaining = total - index - 1;
                    record_connect_attempt(if retryable { "retryable" } else { "terminal" });
                    warn!(
                        dest = %dest,
                        endpoint = %endpoint,
                        attempt = index + 1,
                        kind = error_kind_name(error.kind()),
                        error = %error,
                        retryable,
                        remaining,
                        "outbound connect failed"
                    );
                    attempts.push(ConnectionAttempt {
                        endpoint,
                        error,
                        retryable,
                    });
                    if !retryable {
                        break;
                    }
                }
            }
        }
        Err(ConnectError { attempts })
    }

    /// Dial, write the inline payload, flush. The stream is dropped on any
    /// failure.
    async fn attempt(&self, endpoint: &Endpoint, payload: &[u8]) -> io::Result<OutboundStream> {
        let mut stream = self.dialer.dial(endpoint).await?;
        if !payload.is_empty() {
            stream.write_all(payload).await?;
            stream.flush().await?;
        }
        Ok(stream)
    }
}

impl fmt::Debug for OutboundConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundConnector")
            .field("fallback_hosts", &self.fallback_hosts)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
