//! WebSocket transport to the ircws relay.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::{Transport, TransportError};
use crate::handshake::{PeerFrame, ProxyTarget, RelayFrame};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client side of the relay protocol.
///
/// `connect` opens the WebSocket, asks the relay to bridge to `target` and
/// waits for its `ready` frame. After that each text frame is one chunk of
/// IRC text.
pub struct WebSocketTransport {
    url: String,
    target: ProxyTarget,
    socket: Option<Socket>,
}

impl WebSocketTransport {
    /// Transport that will reach `target` through the relay at `url`.
    pub fn new(url: impl Into<String>, target: ProxyTarget) -> Self {
        Self {
            url: url.into(),
            target,
            socket: None,
        }
    }

    /// The IRC server this transport asks for.
    pub fn target(&self) -> &ProxyTarget {
        &self.target
    }

    fn socket(&mut self) -> Result<&mut Socket, TransportError> {
        self.socket.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("url", &self.url)
            .field("target", &self.target)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}

/// Wait for the relay's acknowledgement.
async fn await_ready(socket: &mut Socket) -> Result<(), TransportError> {
    while let Some(frame) = socket.next().await {
        match frame? {
            WsMessage::Text(text) => {
                if text.starts_with("ERROR") {
                    return Err(TransportError::Rejected(text.trim_end().to_owned()));
                }
                match serde_json::from_str::<RelayFrame>(&text) {
                    Ok(RelayFrame::Ready) => return Ok(()),
                    Err(e) => {
                        warn!(error = %e, "unexpected frame during relay handshake");
                        return Err(e.into());
                    }
                }
            }
            WsMessage::Close(_) => return Err(TransportError::Closed),
            _ => {}
        }
    }
    Err(TransportError::Closed)
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let (mut socket, _response) = connect_async(self.url.as_str()).await?;
        debug!(url = %self.url, host = %self.target.host, port = self.target.port, "relay connected");

        let request = serde_json::to_string(&PeerFrame::Proxy(self.target.clone()))?;
        socket.send(WsMessage::Text(request)).await?;
        await_ready(&mut socket).await?;

        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        let socket = self.socket()?;
        socket.send(WsMessage::Text(format!("{line}\r\n"))).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        let socket = match self.socket() {
            Ok(socket) => socket,
            Err(e) => return Some(Err(e)),
        };

        loop {
            match socket.next().await? {
                Ok(WsMessage::Text(text)) => return Some(Ok(text)),
                Ok(WsMessage::Binary(bytes)) => {
                    return Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Ok(WsMessage::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                debug!(error = %e, "websocket close failed");
            }
        }
        Ok(())
    }
}
