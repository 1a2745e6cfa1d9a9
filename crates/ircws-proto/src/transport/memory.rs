//! In-process transport pair.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Transport, TransportError};

/// Create a connected transport and the peer that plays the server side.
pub fn pair() -> (MemoryTransport, MemoryPeer) {
    let (to_peer, from_client) = mpsc::unbounded_channel();
    let (to_client, from_peer) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            tx: to_peer,
            rx: from_peer,
            connected: false,
        },
        MemoryPeer {
            tx: Some(to_client),
            rx: from_client,
        },
    )
}

/// Client half of [`pair`].
#[derive(Debug)]
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
    connected: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.tx.is_closed() {
            return Err(TransportError::Closed);
        }
        self.connected = true;
        Ok(())
    }

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.tx
            .send(format!("{line}\r\n"))
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        if !self.connected {
            return Some(Err(TransportError::NotConnected));
        }
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        self.rx.close();
        Ok(())
    }
}

/// Server half of [`pair`]: scripts what the client receives and observes
/// what it sends.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Deliver a raw chunk. Returns `false` once the client side is gone.
    pub fn send_raw(&self, chunk: &str) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(chunk.to_owned()).is_ok())
    }

    /// Deliver one line, terminated with `\r\n`.
    pub fn send_line(&self, line: &str) -> bool {
        self.send_raw(&format!("{line}\r\n"))
    }

    /// Next line the client sent, without its terminator.
    pub async fn recv_line(&mut self) -> Option<String> {
        self.rx
            .recv()
            .await
            .map(|chunk| chunk.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// A line the client already sent, if any, without waiting.
    pub fn try_recv_line(&mut self) -> Option<String> {
        self.rx
            .try_recv()
            .ok()
            .map(|chunk| chunk.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Hang up; the client's next `recv` returns `None`.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_cross_in_both_directions() {
        let (mut transport, mut peer) = pair();
        transport.connect().await.unwrap();

        transport.send("NICK bot").await.unwrap();
        assert_eq!(peer.recv_line().await.as_deref(), Some("NICK bot"));

        assert!(peer.send_raw("PING :a\r\nPI"));
        assert_eq!(transport.recv().await.unwrap().unwrap(), "PING :a\r\nPI");
    }

    #[tokio::test]
    async fn send_before_connect_fails() {
        let (mut transport, _peer) = pair();
        assert!(matches!(
            transport.send("NICK bot").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn peer_close_ends_stream() {
        let (mut transport, mut peer) = pair();
        transport.connect().await.unwrap();
        peer.close();
        assert!(transport.recv().await.is_none());
    }
}
