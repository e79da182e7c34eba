//! Replay adapter for bytes consumed during upgrade inspection.
//!
//! The server reads the HTTP upgrade request off the socket before deciding
//! whether to hand it to the WebSocket handshake. `PrefixedStream` puts those
//! bytes back in front of the socket so the handshake sees the full request.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Stream that yields `head` before reading from `inner`. Writes pass through.
#[derive(Debug)]
pub struct PrefixedStream<S> {
    head: Bytes,
    inner: S,
}

impl<S> PrefixedStream<S> {
    pub fn new(head: Bytes, inner: S) -> Self {
        Self { head, inner }
    }

    /// Number of replay bytes not yet read.
    pub fn pending(&self) -> usize {
        self.head.len()
    }

    /// Returns the inner stream, discarding any unread replay bytes.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PrefixedStream<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.head.has_remaining() {
            let n = self.head.len().min(buf.remaining());
            buf.put_slice(&self.head[..n]);
            self.head.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PrefixedStream<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, data)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
