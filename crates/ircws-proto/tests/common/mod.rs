//! Scripted server side for protocol engine tests.

use std::sync::Arc;

use ircws_proto::transport::pair;
use ircws_proto::{Client, ConnectError, Connection, MemoryPeer};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

const STEP: Duration = Duration::from_secs(5);

/// Next line the client sent, failing the test if none arrives.
pub async fn expect_line(peer: &mut MemoryPeer) -> String {
    timeout(STEP, peer.recv_line())
        .await
        .expect("client sent nothing")
        .expect("client hung up")
}

/// Consume NICK/USER for `nick` and finish the MOTD.
pub async fn accept_registration(peer: &mut MemoryPeer, nick: &str) {
    assert_eq!(expect_line(peer).await, format!("NICK {nick}"));
    assert_eq!(expect_line(peer).await, format!("USER {nick} 8 * :{nick}"));
    peer.send_line(&format!(":irc.test 001 {nick} :Welcome"));
    peer.send_line(&format!(":irc.test 376 {nick} :End of /MOTD command."));
}

/// Round-trip a PING so everything sent before it has been dispatched.
pub async fn sync(peer: &mut MemoryPeer) {
    peer.send_line("PING :sync");
    assert_eq!(expect_line(peer).await, "PONG :sync");
}

#[allow(dead_code)]
pub fn spawn_open(connection: &Connection) -> JoinHandle<Result<(), ConnectError>> {
    let connection = connection.clone();
    tokio::spawn(async move { connection.open().await })
}

/// A client registered as `nick` and the peer driving it.
#[allow(dead_code)]
pub async fn registered_client(nick: &str) -> (Client, MemoryPeer) {
    let (transport, mut peer) = pair();
    let client = Client::new(nick, transport);
    let opening = spawn_open(client.connection());
    accept_registration(&mut peer, nick).await;
    opening
        .await
        .expect("open task panicked")
        .expect("registration failed");
    (client, peer)
}

/// Shared sink for events captured by listeners.
#[allow(dead_code)]
pub fn recorder<T>() -> Arc<std::sync::Mutex<Vec<T>>> {
    Arc::new(std::sync::Mutex::new(Vec::new()))
}
