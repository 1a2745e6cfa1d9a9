//! Duplex piping between a WebSocket peer and an upstream socket.
//!
//! Peer text frames are written upstream verbatim. Upstream bytes are sent
//! to the peer as text frames, without regard to line boundaries. When
//! either side ends, both are closed.

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::error::RelayError;

const READ_BUFFER: usize = 8192;

/// The side that ended a bridged session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hangup {
    /// The WebSocket peer closed or went away.
    Peer,
    /// The IRC server closed its socket.
    Upstream,
}

/// Pipe `ws` and `upstream` into each other until one side ends.
///
/// Returns which side hung up. A transport error on either side is returned
/// after both halves have been closed.
pub async fn pipe<S, U>(ws: WebSocketStream<S>, upstream: U) -> Result<Hangup, RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (mut up_rx, mut up_tx) = tokio::io::split(upstream);

    let inbound = async {
        while let Some(frame) = ws_rx.next().await {
            match frame? {
                Message::Text(text) => up_tx.write_all(text.as_bytes()).await?,
                Message::Binary(data) => up_tx.write_all(&data).await?,
                Message::Close(_) => break,
                // Pings are answered by tungstenite.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok::<_, RelayError>(Hangup::Peer)
    };

    let outbound = async {
        let mut buf = BytesMut::with_capacity(READ_BUFFER);
        let mut carry = Utf8Carry::default();
        loop {
            buf.clear();
            if up_rx.read_buf(&mut buf).await? == 0 {
                if let Some(rest) = carry.finish() {
                    ws_tx.send(Message::Text(rest)).await?;
                }
                return Ok::<_, RelayError>(Hangup::Upstream);
            }
            let text = carry.decode(&buf);
            if !text.is_empty() {
                ws_tx.send(Message::Text(text)).await?;
            }
        }
    };

    let result = tokio::select! {
        result = inbound => result,
        result = outbound => result,
    };

    if let Err(e) = ws_tx.close().await {
        debug!(error = %e, "peer close failed");
    }
    if let Err(e) = up_tx.shutdown().await {
        debug!(error = %e, "upstream shutdown failed");
    }
    result
}

/// Decodes a byte stream as UTF-8 across chunk boundaries.
///
/// A multi-byte sequence split between two chunks is held back until the
/// rest arrives. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub(crate) struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub(crate) fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        out
    }

    /// Whatever is still held back, decoded lossily.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(rest)
    }
}
