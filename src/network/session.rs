//! One bridged session, from WebSocket upgrade to teardown.
//!
//! ```text
//! upgrade (Origin check) ─▶ reconnect ledger ─▶ {"type":"proxy",..}
//!        ─▶ target policy ─▶ FCrDNS (optional) ─▶ upstream connect
//!        ─▶ {"type":"ready"} ─▶ bridge::pipe
//! ```
//!
//! A session refused after the upgrade is told why in an IRC `ERROR` line
//! before the socket is closed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use http::StatusCode;
use ircws_proto::{PeerFrame, ProxyTarget, RelayFrame};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{debug, info, warn};

use super::bridge::{self, Hangup};
use super::upstream::{UpstreamConnector, UpstreamStream};
use crate::config::{SecurityConfig, UpstreamConfig};
use crate::error::RelayError;
use crate::security::{HostResolver, ReconnectLedger, fcrdns};

/// State shared by every session of one gateway.
pub(crate) struct Relay {
    pub(crate) upstream: UpstreamConfig,
    pub(crate) security: SecurityConfig,
    pub(crate) allow_origins: Vec<String>,
    pub(crate) ledger: Arc<ReconnectLedger>,
    pub(crate) resolver: Option<Arc<dyn HostResolver>>,
    pub(crate) connector: UpstreamConnector,
}

/// Whether a WebSocket upgrade from `origin` is allowed.
///
/// An empty allow-list admits everyone; otherwise the `Origin` header must
/// be present and listed, or the list must contain `"*"`.
pub(crate) fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }
    origin.is_some_and(|origin| allowed.iter().any(|a| a == origin || a == "*"))
}

/// Run a session on an accepted stream.
pub(crate) async fn serve<S>(stream: S, addr: SocketAddr, relay: Arc<Relay>) -> Result<(), RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let allowed = relay.allow_origins.clone();
    let origin_check = move |req: &Request, response: Response| {
        let origin = req.headers().get("Origin").and_then(|o| o.to_str().ok());
        if origin_allowed(&allowed, origin) {
            return Ok(response);
        }
        warn!(%addr, origin = ?origin, "WebSocket origin rejected");
        let mut rejection = ErrorResponse::new(Some("Origin not allowed".to_string()));
        *rejection.status_mut() = StatusCode::FORBIDDEN;
        Err(rejection)
    };

    let mut ws = accept_hdr_async(stream, origin_check).await?;
    debug!(%addr, "WebSocket handshake successful");

    let upstream = match establish(&mut ws, addr, &relay).await {
        Ok(upstream) => upstream,
        Err(e) => {
            reject(&mut ws, &e).await;
            return Err(e);
        }
    };

    match bridge::pipe(ws, upstream).await? {
        Hangup::Peer => info!("client hung up"),
        Hangup::Upstream => info!("IRC server hung up"),
    }
    Ok(())
}

/// Everything between the upgrade and the first relayed byte.
async fn establish<S>(
    ws: &mut WebSocketStream<S>,
    addr: SocketAddr,
    relay: &Relay,
) -> Result<UpstreamStream, RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let ip = addr.ip();
    relay.ledger.admit(ip)?;

    let limit = relay.security.handshake_timeout();
    let requested = tokio::time::timeout(limit, read_handshake(ws))
        .await
        .map_err(|_| RelayError::HandshakeTimeout(limit))??;

    let target = relay
        .upstream
        .resolve(&requested)
        .ok_or_else(|| RelayError::TargetNotAllowed {
            host: requested.host.clone(),
            port: requested.port,
        })?;

    if let Some(resolver) = &relay.resolver {
        let host = fcrdns::verify(resolver.as_ref(), ip).await?;
        tracing::Span::current().record("host", host.as_str());
        info!(%host, "peer verified");
    }

    info!(host = %target.host, port = target.port, tls = target.tls, "connecting to IRC");
    let upstream = connect_upstream(&relay.connector, &target, limit).await?;
    info!(host = %target.host, tls = upstream.is_tls(), "connected to IRC");

    let ready = serde_json::to_string(&RelayFrame::Ready)
        .map_err(|e| RelayError::InvalidHandshake(e.to_string()))?;
    ws.send(Message::Text(ready)).await?;
    Ok(upstream)
}

/// Wait for the peer's `proxy` frame.
async fn read_handshake<S>(ws: &mut WebSocketStream<S>) -> Result<ProxyTarget, RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(frame) = ws.next().await {
        let frame = match frame? {
            Message::Text(text) => serde_json::from_str::<PeerFrame>(&text),
            Message::Binary(data) => serde_json::from_slice::<PeerFrame>(&data),
            Message::Close(_) => return Err(RelayError::PeerClosed),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        return match frame {
            Ok(PeerFrame::Proxy(target)) => Ok(target),
            Err(e) => Err(RelayError::InvalidHandshake(e.to_string())),
        };
    }
    Err(RelayError::PeerClosed)
}

async fn connect_upstream(
    connector: &UpstreamConnector,
    target: &ProxyTarget,
    limit: Duration,
) -> Result<UpstreamStream, RelayError> {
    match tokio::time::timeout(limit, connector.connect(target)).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::Upstream {
            target: format!("{}:{}", target.host, target.port),
            source: std::io::ErrorKind::TimedOut.into(),
        }),
    }
}

/// Tell the peer why it is being dropped, then close.
async fn reject<S>(ws: &mut WebSocketStream<S>, error: &RelayError)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(line) = error.to_irc_line() {
        if let Err(e) = ws.send(Message::Text(line)).await {
            debug!(error = %e, "failed to send rejection");
            return;
        }
    }
    if let Err(e) = ws.close(None).await {
        debug!(error = %e, "failed to close rejected peer");
    }
}
