//! Registration, keep-alive, feature negotiation and dispatch over an
//! in-memory transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{accept_registration, expect_line, recorder, spawn_open, sync};
use ircws_proto::transport::pair;
use ircws_proto::{
    ConnectError, Connection, ConnectionOptions, ConnectionState, FeatureValue, Message,
    Observable,
};

#[tokio::test]
async fn registration_resolves_on_end_of_motd() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;

    opening.await.unwrap().unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(connection.nick(), "bot");
}

#[tokio::test]
async fn missing_motd_counts_as_end_of_motd() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);

    expect_line(&mut peer).await;
    expect_line(&mut peer).await;
    peer.send_line(":irc.test 422 bot :MOTD File is missing");

    opening.await.unwrap().unwrap();
}

#[tokio::test]
async fn nick_collision_retries_exactly_once() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);

    expect_line(&mut peer).await;
    expect_line(&mut peer).await;

    peer.send_line(":irc.test 433 * bot :Nickname is already in use");
    assert_eq!(expect_line(&mut peer).await, "NICK bot_");
    assert_eq!(connection.nick(), "bot_");

    peer.send_line(":irc.test 433 * bot_ :Nickname is already in use");
    let err = opening.await.unwrap().unwrap_err();
    assert!(matches!(err, ConnectError::NicknameInUse(ref nick) if nick == "bot_"));

    // The drive task closes the transport; nothing else is sent.
    assert_eq!(peer.recv_line().await, None);
}

#[tokio::test]
async fn collision_then_motd_registers_under_fallback() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);

    expect_line(&mut peer).await;
    expect_line(&mut peer).await;
    peer.send_line(":irc.test 433 * bot :Nickname is already in use");
    assert_eq!(expect_line(&mut peer).await, "NICK bot_");
    peer.send_line(":irc.test 001 bot_ :Welcome");
    peer.send_line(":irc.test 376 bot_ :End of /MOTD command.");

    opening.await.unwrap().unwrap();
    assert_eq!(connection.nick(), "bot_");
    assert!(connection.is_me("BOT_"));
}

#[tokio::test]
async fn isupport_features_accumulate() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    peer.send_line(":irc.test 005 bot CHANTYPES=# PREFIX=(ov)@+ :are supported by this server");
    peer.send_line(":irc.test 005 bot EXCEPTS NETWORK=Test :are supported by this server");
    sync(&mut peer).await;

    let features = connection.features();
    assert_eq!(features.value("CHANTYPES"), Some("#"));
    assert_eq!(features.value("PREFIX"), Some("(ov)@+"));
    assert_eq!(features.get("EXCEPTS"), Some(&FeatureValue::Flag));
    assert_eq!(features.value("NETWORK"), Some("Test"));
    assert_eq!(features.len(), 4);
}

#[tokio::test]
async fn ping_is_answered_with_same_token() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    peer.send_raw("PING :irc.te");
    peer.send_raw("st\r\n");
    assert_eq!(expect_line(&mut peer).await, "PONG :irc.test");

    peer.send_line("PING token");
    assert_eq!(expect_line(&mut peer).await, "PONG :token");
}

#[tokio::test]
async fn ping_token_with_spaces_survives_the_round_trip() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    peer.send_line("PING :abc def");
    let reply: Message = expect_line(&mut peer).await.parse().unwrap();
    assert_eq!(reply.command, "PONG");
    assert_eq!(reply.params, vec!["abc def"]);

    peer.send_line("PING ::colon");
    let reply: Message = expect_line(&mut peer).await.parse().unwrap();
    assert_eq!(reply.params, vec![":colon"]);
}

#[tokio::test]
async fn server_error_fails_open() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);

    expect_line(&mut peer).await;
    expect_line(&mut peer).await;
    peer.send_line("ERROR :Closing Link: bot (Banned)");

    let err = opening.await.unwrap().unwrap_err();
    assert!(matches!(err, ConnectError::Server(ref text) if text.contains("Banned")));
}

#[tokio::test]
async fn closed_transport_fails_open() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);

    expect_line(&mut peer).await;
    peer.close();

    let err = opening.await.unwrap().unwrap_err();
    assert!(matches!(err, ConnectError::Closed));
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn handshake_times_out_without_motd() {
    let (transport, mut peer) = pair();
    let options = ConnectionOptions {
        handshake_timeout: Duration::from_secs(30),
        ..ConnectionOptions::default()
    };
    let connection = Connection::with_options("bot", transport, options);
    let opening = spawn_open(&connection);

    expect_line(&mut peer).await;
    expect_line(&mut peer).await;

    let err = opening.await.unwrap().unwrap_err();
    assert!(matches!(err, ConnectError::HandshakeTimeout(d) if d == Duration::from_secs(30)));
}

#[tokio::test]
async fn open_twice_is_rejected() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    assert!(matches!(
        connection.open().await,
        Err(ConnectError::AlreadyOpened)
    ));
}

#[tokio::test]
async fn registered_handler_replaces_default() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
    connection.on("ping", move |message| {
        let _ = seen_tx.send(message.last_param().unwrap_or_default().to_owned());
    });

    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    peer.send_line("PING :one");
    assert_eq!(seen_rx.recv().await.as_deref(), Some("one"));

    // Had the default run, its PONG would already be queued ahead of this.
    connection.send("PRIVMSG #ops :after").unwrap();
    assert_eq!(expect_line(&mut peer).await, "PRIVMSG #ops :after");
}

#[tokio::test]
async fn all_event_sees_every_message_in_order() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let log = recorder::<String>();
    let sink = Arc::clone(&log);
    connection.on("all", move |message| {
        sink.lock().unwrap().push(message.command.clone());
    });

    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    peer.send_line(":a!b@c PRIVMSG bot :hi");
    peer.send_line("12 garbage");
    peer.send_line(":irc.test 999 bot :unknown");
    sync(&mut peer).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["001", "376", "PRIVMSG", "999", "PING"]
    );
}

#[tokio::test]
async fn lines_queued_before_open_follow_registration() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    connection.send("CAP END").unwrap();

    let _opening = spawn_open(&connection);
    assert_eq!(expect_line(&mut peer).await, "NICK bot");
    assert_eq!(expect_line(&mut peer).await, "USER bot 8 * :bot");
    assert_eq!(expect_line(&mut peer).await, "CAP END");
}

#[tokio::test]
async fn state_watch_reports_close() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let mut states = connection.watch_state();

    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    connection.close();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == ConnectionState::Closed),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(peer.recv_line().await, None);
}

#[tokio::test]
async fn dropping_last_handle_closes_transport() {
    let (transport, mut peer) = pair();
    let connection = Connection::new("bot", transport);
    let mut states = connection.watch_state();
    let opening = spawn_open(&connection);
    accept_registration(&mut peer, "bot").await;
    opening.await.unwrap().unwrap();

    let clone = connection.clone();
    drop(connection);
    clone.send("PRIVMSG #ops :still here").unwrap();
    assert_eq!(expect_line(&mut peer).await, "PRIVMSG #ops :still here");

    drop(clone);
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == ConnectionState::Closed),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(peer.recv_line().await, None);
}
