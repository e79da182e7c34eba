//! Per-channel session.
//!
//! One task drives each [`Session`]. The first client message picks the
//! protocol: a binary message carries the request header, a text message is
//! a control line. From then on every message goes through one dispatch
//! point keyed on the committed protocol and the current [`SessionState`].
//! A text session stays in `Detecting` until its `CONNECT` line arrives.
//!
//! While authorizing or connecting the session keeps reading the channel so a
//! close is noticed; payload arriving in that window has no outbound writer
//! and is dropped. Once relaying, client messages and outbound reads are
//! awaited together in a single `select!`, so both directions are handled by
//! the same task and the inline payload always reaches the destination first.
//!
//! Every exit path ends in [`Session::teardown`], which runs at most once.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{
    self, Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
use tracing::{debug, warn};

use edgerelay_core::WS_CLOSE_REASON;
use edgerelay_metrics::{
    record_auth_failure, record_auth_success, record_bytes_downstream, record_bytes_upstream,
    record_session,
};
use edgerelay_proto::{
    CLOSE, CONNECTED, ControlFrame, Destination, ParseResult, ack_frame, error_message,
    parse_request, parse_target,
};

use crate::error::ServerError;
use crate::outbound::OutboundStream;
use crate::state::ServerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Binary,
    Text,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Binary => "binary",
            Protocol::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Detecting,
    Authorizing,
    Connecting,
    Relaying,
    Closed,
}

/// Whether the session keeps reading after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Outcome of a phase raced against the client channel.
enum Raced<T> {
    Done(T),
    ClientGone,
}

enum Event {
    Client(Option<Result<Message, tungstenite::Error>>),
    Outbound(std::io::Result<usize>),
}

pub struct Session<S> {
    ws: WebSocketStream<S>,
    shared: Arc<ServerState>,
    peer: SocketAddr,
    state: SessionState,
    protocol: Option<Protocol>,
    destination: Option<Destination>,
    outbound: Option<OutboundStream>,
    /// Set once the client sent a close frame or the channel failed.
    client_closed: bool,
    /// Set when the channel ended or failed; nothing more can be written.
    channel_gone: bool,
    buf: Vec<u8>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(ws: WebSocketStream<S>, shared: Arc<ServerState>, peer: SocketAddr) -> Self {
        let buf = vec![0u8; shared.relay_buffer_size];
        Self {
            ws,
            shared,
            peer,
            state: SessionState::Detecting,
            protocol: None,
            destination: None,
            outbound: None,
            client_closed: false,
            channel_gone: false,
            buf,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    /// Drives the session to completion.
    ///
    /// A failing text session is told `ERROR:<message>` before teardown.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let result = self.drive().await;
        if let Err(err) = &result {
            debug!(peer = %self.peer, error = %err, "session failed");
            if self.protocol == Some(Protocol::Text) && !self.client_closed {
                let _ = self.ws.send(Message::Text(error_message(err))).await;
            }
        }
        self.teardown().await;
        result
    }

    async fn drive(&mut self) -> Result<(), ServerError> {
        loop {
            match self.next_event().await {
                Event::Client(Some(Ok(msg))) => {
                    if self.dispatch(msg).await? == Flow::Stop {
                        return Ok(());
                    }
                }
                Event::Client(Some(Err(e))) => {
                    debug!(peer = %self.peer, error = %e, "channel error");
                    self.mark_gone();
                    return Ok(());
                }
                Event::Client(None) => {
                    self.mark_gone();
                    return Ok(());
                }
                Event::Outbound(Ok(0)) => {
                    debug!(peer = %self.peer, "outbound reached end of stream");
                    return self.outbound_finished().await;
                }
                Event::Outbound(Ok(n)) => {
                    record_bytes_downstream(n as u64);
                    self.ws.send(Message::Binary(self.buf[..n].to_vec())).await?;
                }
                Event::Outbound(Err(e)) => {
                    debug!(peer = %self.peer, error = %e, "outbound read failed");
                    return self.outbound_finished().await;
                }
            }
        }
    }

    async fn next_event(&mut self) -> Event {
        match self.outbound.as_mut() {
            Some(outbound) => tokio::select! {
                msg = self.ws.next() => Event::Client(msg),
                read = outbound.read(&mut self.buf) => Event::Outbound(read),
            },
            None => Event::Client(self.ws.next().await),
        }
    }

    async fn outbound_finished(&mut self) -> Result<(), ServerError> {
        if self.protocol == Some(Protocol::Text) && !self.client_closed {
            self.ws.send(Message::Text(CLOSE.to_string())).await?;
        }
        Ok(())
    }

    /// Single dispatch point for client messages.
    async fn dispatch(&mut self, msg: Message) -> Result<Flow, ServerError> {
        if let Message::Close(_) = msg {
            self.client_closed = true;
            return Ok(Flow::Stop);
        }
        match (self.protocol, self.state) {
            (_, SessionState::Closed) => Ok(Flow::Stop),
            (None, _) => self.detect(msg).await,
            (Some(Protocol::Text), _) => self.on_text_message(msg).await,
            (Some(Protocol::Binary), _) => {
                if let Some(data) = payload_bytes(msg) {
                    self.forward(&data).await?;
                }
                Ok(Flow::Continue)
            }
        }
    }

    async fn detect(&mut self, msg: Message) -> Result<Flow, ServerError> {
        match msg {
            Message::Binary(data) => {
                self.commit(Protocol::Binary);
                self.on_binary_header(data).await
            }
            Message::Text(text) => {
                self.commit(Protocol::Text);
                self.on_text_message(Message::Text(text)).await
            }
            // Control frames never classify a channel.
            _ => Ok(Flow::Continue),
        }
    }

    fn commit(&mut self, protocol: Protocol) {
        self.protocol = Some(protocol);
        record_session(protocol.as_str());
        debug!(peer = %self.peer, protocol = protocol.as_str(), "protocol detected");
    }

    async fn on_binary_header(&mut self, data: Vec<u8>) -> Result<Flow, ServerError> {
        let (version, identity, dest, header_len) = match parse_request(&data) {
            ParseResult::Complete(req) => (
                req.version,
                req.identity_string(),
                req.address.to_destination(),
                req.header_len,
            ),
            ParseResult::Incomplete(_) => return Err(ServerError::Truncated),
            ParseResult::Invalid(e) => return Err(ServerError::Proto(e)),
        };
        debug!(peer = %self.peer, dest = %dest, "binary request");

        self.state = SessionState::Authorizing;
        let directory = self.shared.directory.clone();
        let now = OffsetDateTime::now_utc();
        let resolution = match self.race_client(directory.resolve(&identity, now)).await? {
            Raced::Done(resolution) => resolution,
            Raced::ClientGone => return Ok(Flow::Stop),
        };
        let authorized = match resolution {
            Ok(r) if r.is_valid() => {
                record_auth_success();
                true
            }
            Ok(r) => {
                debug!(peer = %self.peer, status = %r.status, "identity rejected");
                record_auth_failure(r.status.as_str());
                false
            }
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "token directory lookup failed");
                record_auth_failure("backend");
                false
            }
        };

        // Same frame on both outcomes; only what follows differs.
        self.ws.send(Message::Binary(ack_frame(version).to_vec())).await?;
        if !authorized {
            return Ok(Flow::Stop);
        }

        self.connect(dest, &data[header_len..]).await
    }

    async fn on_text_message(&mut self, msg: Message) -> Result<Flow, ServerError> {
        let text = match msg {
            Message::Text(text) => text,
            Message::Binary(data) => {
                if self.outbound.is_some() {
                    self.forward(&data).await?;
                }
                return Ok(Flow::Continue);
            }
            _ => return Ok(Flow::Continue),
        };
        match ControlFrame::parse(&text) {
            ControlFrame::Connect { target, data } => {
                if self.outbound.is_some() {
                    return Err(ServerError::AlreadyConnected);
                }
                let dest = parse_target(target)?;
                debug!(peer = %self.peer, dest = %dest, "text connect");
                let flow = self.connect(dest, data.as_bytes()).await?;
                if self.state == SessionState::Relaying {
                    self.ws.send(Message::Text(CONNECTED.to_string())).await?;
                }
                Ok(flow)
            }
            ControlFrame::Data(payload) => {
                if self.outbound.is_some() {
                    self.forward(payload.as_bytes()).await?;
                }
                Ok(Flow::Continue)
            }
            ControlFrame::Close => {
                debug!(peer = %self.peer, "client requested close");
                Ok(Flow::Stop)
            }
            ControlFrame::Unknown => Ok(Flow::Continue),
        }
    }

    /// Opens the outbound connection and moves to `Relaying`.
    async fn connect(&mut self, dest: Destination, payload: &[u8]) -> Result<Flow, ServerError> {
        self.state = SessionState::Connecting;
        let connector = self.shared.connector.clone();
        let connected = match self.race_client(connector.connect(&dest, payload)).await? {
            Raced::Done(result) => result?,
            Raced::ClientGone => return Ok(Flow::Stop),
        };
        if !payload.is_empty() {
            record_bytes_upstream(payload.len() as u64);
        }
        debug!(peer = %self.peer, dest = %dest, endpoint = %connected.endpoint, "relaying");
        self.outbound = Some(connected.stream);
        self.destination = Some(dest);
        self.state = SessionState::Relaying;
        Ok(Flow::Continue)
    }

    /// Awaits `fut` while still reading the channel.
    ///
    /// Payload arriving meanwhile is dropped. A close frame, the end of the
    /// channel or, on text sessions, a `CLOSE` line abandons `fut`.
    async fn race_client<F: Future>(&mut self, fut: F) -> Result<Raced<F::Output>, ServerError> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => return Ok(Raced::Done(out)),
                msg = self.ws.next() => match msg {
                    Some(Ok(Message::Close(_))) => {
                        self.client_closed = true;
                        return Ok(Raced::ClientGone);
                    }
                    None => {
                        self.mark_gone();
                        return Ok(Raced::ClientGone);
                    }
                    Some(Err(e)) => {
                        debug!(peer = %self.peer, error = %e, "channel error while pending");
                        self.mark_gone();
                        return Ok(Raced::ClientGone);
                    }
                    // On binary sessions this is payload and gets dropped below.
                    Some(Ok(Message::Text(text)))
                        if self.protocol == Some(Protocol::Text) && text == CLOSE =>
                    {
                        return Ok(Raced::ClientGone);
                    }
                    Some(Ok(_)) => {
                        debug!(peer = %self.peer, state = ?self.state, "message dropped, no outbound yet");
                    }
                },
            }
        }
    }

    fn mark_gone(&mut self) {
        self.client_closed = true;
        self.channel_gone = true;
    }

    async fn forward(&mut self, data: &[u8]) -> Result<(), ServerError> {
        let Some(outbound) = self.outbound.as_mut() else {
            return Ok(());
        };
        outbound.write_all(data).await?;
        outbound.flush().await?;
        record_bytes_upstream(data.len() as u64);
        Ok(())
    }

    /// Releases the outbound stream and closes the channel.
    ///
    /// Returns `false` when the session was already closed.
    pub async fn teardown(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Closed;
        if let Some(mut outbound) = self.outbound.take() {
            let _ = outbound.shutdown().await;
        }
        // After a peer-initiated close this only flushes the queued reply.
        if !self.channel_gone {
            self.mark_gone();
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: WS_CLOSE_REASON.into(),
            };
            let _ = self.ws.close(Some(frame)).await;
        }
        debug!(
            peer = %self.peer,
            dest = ?self.destination.as_ref().map(ToString::to_string),
            "session closed"
        );
        true
    }
}

/// Bytes a relaying binary session writes for a message.
fn payload_bytes(msg: Message) -> Option<Vec<u8>> {
    match msg {
        Message::Binary(data) => Some(data),
        Message::Text(text) => Some(text.into_bytes()),
        _ => None,
    }
}
