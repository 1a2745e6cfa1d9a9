//! Gateway, fake IRC server and WebSocket peer for relay tests.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use ircws::security::{HostResolver, ReconnectLedger};
use ircws::{Config, Gateway};
use ircws_proto::{PeerFrame, ProxyTarget};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const STEP: Duration = Duration::from_secs(5);

pub type Peer = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay config pointing at `upstream_port` on localhost.
pub fn config(upstream_port: u16, extra: &str) -> Config {
    toml::from_str(&format!(
        r#"
[listen]
address = "127.0.0.1:0"

[upstream]
host = "127.0.0.1"
port = {upstream_port}

{extra}
"#
    ))
    .expect("test config parses")
}

pub struct Relay {
    pub addr: SocketAddr,
    pub ledger: Arc<ReconnectLedger>,
}

impl Relay {
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

/// Bind and run a gateway in the background.
pub async fn start_relay(config: Config, resolver: Option<Arc<dyn HostResolver>>) -> Relay {
    let mut gateway = Gateway::bind(&config).await.expect("gateway binds");
    if let Some(resolver) = resolver {
        gateway = gateway.with_resolver(resolver);
    }
    let relay = Relay {
        addr: gateway.local_addr().unwrap(),
        ledger: gateway.ledger(),
    };
    tokio::spawn(gateway.run());
    relay
}

/// A listening fake IRC server.
pub async fn irc_server() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

pub async fn accept_upstream(listener: &TcpListener) -> BufReader<TcpStream> {
    let (socket, _) = timeout(STEP, listener.accept())
        .await
        .expect("relay never connected upstream")
        .unwrap();
    BufReader::new(socket)
}

/// Next line written upstream, without its terminator.
pub async fn upstream_line(upstream: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    let n = timeout(STEP, upstream.read_line(&mut line))
        .await
        .expect("nothing written upstream")
        .unwrap();
    assert!(n > 0, "relay closed the upstream socket");
    line.trim_end_matches(['\r', '\n']).to_owned()
}

/// Wait for the relay to close the upstream socket.
pub async fn expect_upstream_eof(upstream: &mut BufReader<TcpStream>) {
    let mut rest = Vec::new();
    timeout(STEP, upstream.read_to_end(&mut rest))
        .await
        .expect("upstream socket left open")
        .unwrap();
}

pub async fn open_peer(relay: &Relay) -> Peer {
    let (ws, _) = connect_async(relay.url()).await.expect("websocket upgrade");
    ws
}

pub async fn send_handshake(ws: &mut Peer, port: u16) {
    let frame = PeerFrame::Proxy(ProxyTarget::new("127.0.0.1", port, false));
    ws.send(Message::Text(serde_json::to_string(&frame).unwrap()))
        .await
        .unwrap();
}

/// Next text frame from the relay, `None` once it closes.
pub async fn next_text(ws: &mut Peer) -> Option<String> {
    loop {
        let frame = timeout(STEP, ws.next()).await.expect("relay sent nothing");
        match frame {
            Some(Ok(Message::Text(text))) => return Some(text),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

/// Collect relayed text until it holds `lines` complete lines.
pub async fn read_lines(ws: &mut Peer, lines: usize) -> Vec<String> {
    let mut buffer = String::new();
    while buffer.matches("\r\n").count() < lines {
        let chunk = next_text(ws).await.expect("relay closed early");
        buffer.push_str(&chunk);
    }
    buffer.split_terminator("\r\n").map(str::to_owned).collect()
}
