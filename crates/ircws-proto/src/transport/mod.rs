//! The text transport the protocol engine runs on.
//!
//! A [`Transport`] moves opaque text: chunks in, lines out. Incoming chunk
//! boundaries are arbitrary; [`FrameReader`](crate::FrameReader) restores the
//! line structure. Outgoing lines are passed without a terminator and the
//! transport appends `\r\n`.
//!
//! Two implementations ship with the crate:
//! - [`WebSocketTransport`]: talks to the ircws relay, performing its proxy
//!   handshake before any IRC text flows.
//! - [`MemoryTransport`]: an in-process pair, for embedding and tests.

mod memory;
mod websocket;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::{pair, MemoryPeer, MemoryTransport};
pub use self::websocket::WebSocketTransport;

/// Errors raised by a transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// An I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket layer failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A handshake frame could not be encoded or decoded.
    #[error("handshake frame error: {0}")]
    Json(#[from] serde_json::Error),

    /// The relay refused the connection; carries its `ERROR` line.
    #[error("rejected by relay: {0}")]
    Rejected(String),

    /// The other side went away.
    #[error("transport closed")]
    Closed,

    /// `send` or `recv` was called before `connect`.
    #[error("transport not connected")]
    NotConnected,
}

/// A bidirectional text channel to an IRC server.
///
/// `recv` must be cancel-safe: the connection polls it in a `select!` next to
/// its outgoing queue, and a dropped `recv` future must not lose a chunk.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Establish the underlying connection.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Send one line; `\r\n` is appended.
    async fn send(&mut self, line: &str) -> Result<(), TransportError>;

    /// Next received chunk, or `None` once the transport is closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the transport. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect().await
    }

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        (**self).send(line).await
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        (**self).recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
