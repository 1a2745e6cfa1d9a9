//! Protocol connection: registration, keep-alive, features and dispatch.
//!
//! A [`Connection`] owns one [`Transport`] and runs it in its own Tokio task:
//!
//! ```text
//!  open() ──spawn──▶ drive task
//!                    │ transport.connect()      Connecting
//!                    │ NICK / USER              Handshaking
//!                    ▼
//!               tokio::select! ◄──────────────── outbox (send(), handlers)
//!                    │
//!                    ▼
//!      FrameReader ─▶ Message ─▶ registered handler │ default handler
//!                                       └──▶ "all"
//!                    │ 376 / 422                Ready
//!                    │ ERROR / EOF / close()    Closed
//! ```
//!
//! Messages are dispatched one at a time, in wire order, on the drive task.
//! Handlers run inline and must not block; anything they want to send goes
//! through the outbox and is written before the next chunk is read.

mod handlers;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tracing::{debug, info, warn};

use crate::event::{EventBus, Observable};
use crate::isupport::Features;
use crate::line::FrameReader;
use crate::message::Message;
use crate::transport::{Transport, TransportError};

/// Default time allowed between `open` and the end of the MOTD.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle of a [`Connection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not opened yet.
    Disconnected,
    /// Transport is connecting.
    Connecting,
    /// Registration sent, waiting for the end of the MOTD.
    Handshaking,
    /// Registered.
    Ready,
    /// Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Ready => "ready",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why [`Connection::open`] failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectError {
    /// The transport could not connect or failed during registration.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The server sent `ERROR` before registration completed.
    #[error("server error: {0}")]
    Server(String),

    /// Both the nick and its underscored fallback were rejected.
    #[error("nickname {0} is already in use")]
    NicknameInUse(String),

    /// No end-of-MOTD arrived in time.
    #[error("no end of MOTD within {0:?}")]
    HandshakeTimeout(Duration),

    /// `open` was already called on this connection.
    #[error("connection already opened")]
    AlreadyOpened,

    /// The connection closed.
    #[error("connection closed")]
    Closed,
}

/// Tunables for a [`Connection`].
#[derive(Clone, Debug)]
pub struct ConnectionOptions {
    /// How long `open` waits for the end of the MOTD.
    pub handshake_timeout: Duration,
    /// Line length limit handed to the [`FrameReader`].
    pub max_line_len: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_line_len: crate::line::MAX_IRC_LINE_LEN,
        }
    }
}

type Handshake = oneshot::Sender<Result<(), ConnectError>>;

struct Pending {
    transport: Box<dyn Transport>,
    outbox: mpsc::UnboundedReceiver<String>,
}

pub(crate) struct Shared {
    nick: String,
    current_nick: RwLock<String>,
    nick_retried: AtomicBool,
    reader: Mutex<FrameReader>,
    features: RwLock<Features>,
    events: EventBus<Message>,
    outbox: mpsc::UnboundedSender<String>,
    pending: Mutex<Option<Pending>>,
    handshake: Mutex<Option<Handshake>>,
    state: watch::Sender<ConnectionState>,
    shutdown: Notify,
    options: ConnectionOptions,
}

/// A registered IRC session over a [`Transport`].
///
/// Cloning is cheap; clones share the session. Dropping the last clone closes
/// it, as [`close`](Connection::close) would.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
    _lease: Arc<Lease>,
}

/// Held by every [`Connection`] clone but never by the drive task.
struct Lease {
    shared: Arc<Shared>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.shared.shutdown.notify_one();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("nick", &*self.shared.current_nick.read())
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Connection that will register as `nick`.
    pub fn new(nick: impl Into<String>, transport: impl Transport) -> Self {
        Self::with_options(nick, transport, ConnectionOptions::default())
    }

    /// Connection with explicit options.
    pub fn with_options(
        nick: impl Into<String>,
        transport: impl Transport,
        options: ConnectionOptions,
    ) -> Self {
        let nick = nick.into();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        let shared = Arc::new(Shared {
            current_nick: RwLock::new(nick.clone()),
            nick,
            nick_retried: AtomicBool::new(false),
            reader: Mutex::new(FrameReader::with_max_len(options.max_line_len)),
            features: RwLock::new(Features::new()),
            events: EventBus::new(),
            outbox: outbox_tx,
            pending: Mutex::new(Some(Pending {
                transport: Box::new(transport),
                outbox: outbox_rx,
            })),
            handshake: Mutex::new(None),
            state,
            shutdown: Notify::new(),
            options,
        });
        Self {
            _lease: Arc::new(Lease {
                shared: Arc::clone(&shared),
            }),
            shared,
        }
    }

    /// Connect, register, and wait for the end of the MOTD.
    ///
    /// Sends `NICK <nick>` and `USER <nick> 8 * :<nick>` as soon as the
    /// transport is up. Resolves on 376 (or 422 when the server has no MOTD).
    /// A server `ERROR`, a transport failure, a second nick collision or the
    /// handshake timeout resolve it with the matching [`ConnectError`].
    pub async fn open(&self) -> Result<(), ConnectError> {
        let pending = self
            .shared
            .pending
            .lock()
            .take()
            .ok_or(ConnectError::AlreadyOpened)?;

        let (tx, rx) = oneshot::channel();
        *self.shared.handshake.lock() = Some(tx);

        tokio::spawn(drive(Arc::clone(&self.shared), pending));

        let limit = self.shared.options.handshake_timeout;
        match tokio::time::timeout(limit, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ConnectError::Closed),
            Err(_) => {
                warn!(nick = %self.shared.nick, timeout = ?limit, "handshake timed out");
                self.shared.handshake.lock().take();
                self.close();
                Err(ConnectError::HandshakeTimeout(limit))
            }
        }
    }

    /// Queue a raw command line, without terminator.
    ///
    /// Lines queued before `open` are written right after registration.
    pub fn send(&self, line: impl Into<String>) -> Result<(), ConnectError> {
        self.shared.send(line.into())
    }

    /// Snapshot of the features advertised so far.
    pub fn features(&self) -> Features {
        self.shared.features.read().clone()
    }

    /// Run `f` against the live feature map without cloning it.
    pub fn with_features<R>(&self, f: impl FnOnce(&Features) -> R) -> R {
        f(&self.shared.features.read())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// The nick the server currently knows us by.
    pub fn nick(&self) -> String {
        self.shared.current_nick.read().clone()
    }

    /// The nick this connection was created with.
    pub fn requested_nick(&self) -> &str {
        &self.shared.nick
    }

    /// Whether `nick` is us.
    pub fn is_me(&self, nick: &str) -> bool {
        crate::casemap::irc_eq(&self.shared.current_nick.read(), nick)
    }

    /// Stop the drive task and close the transport.
    pub fn close(&self) {
        self.shared.shutdown.notify_one();
    }
}

impl Observable for Connection {
    type Event = Message;

    fn events(&self) -> &EventBus<Message> {
        &self.shared.events
    }
}

impl Shared {
    fn send(&self, line: String) -> Result<(), ConnectError> {
        self.outbox.send(line).map_err(|_| ConnectError::Closed)
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "connection state");
        }
    }

    /// Resolve a pending `open`. Later calls are no-ops.
    fn finish_handshake(&self, result: Result<(), ConnectError>) {
        if let Some(tx) = self.handshake.lock().take() {
            if result.is_ok() {
                self.set_state(ConnectionState::Ready);
                info!(nick = %self.current_nick.read(), "registered");
            }
            let _ = tx.send(result);
        }
    }

    fn handshake_pending(&self) -> bool {
        self.handshake.lock().is_some()
    }

    /// Frame, parse and dispatch one received chunk.
    fn ingest(&self, chunk: &str) {
        let lines = self.reader.lock().push(chunk);
        for line in lines {
            match line.parse::<Message>() {
                Ok(message) => self.dispatch(&message),
                Err(e) => debug!(error = %e, "dropping malformed line"),
            }
        }
    }

    fn dispatch(&self, message: &Message) {
        self.track(message);

        let name = message.command.to_ascii_lowercase();
        if self.events.emit(&name, message) == 0 && !self.default_handler(message) {
            debug!(command = %message.command, params = ?message.params, "unhandled message");
        }
        self.events.emit("all", message);
    }
}

async fn drive(shared: Arc<Shared>, pending: Pending) {
    let Pending {
        mut transport,
        mut outbox,
    } = pending;

    shared.set_state(ConnectionState::Connecting);
    let connected = tokio::select! {
        result = transport.connect() => result,
        _ = shared.shutdown.notified() => Err(TransportError::Closed),
    };
    if let Err(e) = connected {
        warn!(error = %e, "transport connect failed");
        shared.set_state(ConnectionState::Closed);
        shared.finish_handshake(Err(e.into()));
        return;
    }

    shared.set_state(ConnectionState::Handshaking);
    let nick = &shared.nick;
    for line in [format!("NICK {nick}"), format!("USER {nick} 8 * :{nick}")] {
        if let Err(e) = transport.send(&line).await {
            warn!(error = %e, "registration write failed");
            shared.set_state(ConnectionState::Closed);
            shared.finish_handshake(Err(e.into()));
            return;
        }
    }

    loop {
        tokio::select! {
            biased;

            Some(line) = outbox.recv() => {
                if let Err(e) = transport.send(&line).await {
                    warn!(error = %e, "write failed");
                    shared.finish_handshake(Err(e.into()));
                    break;
                }
            }

            _ = shared.shutdown.notified() => {
                debug!("connection shutdown requested");
                break;
            }

            chunk = transport.recv() => {
                match chunk {
                    Some(Ok(chunk)) => shared.ingest(&chunk),
                    Some(Err(e)) => {
                        warn!(error = %e, "read failed");
                        shared.finish_handshake(Err(e.into()));
                        break;
                    }
                    None => {
                        info!("server closed the connection");
                        break;
                    }
                }
            }
        }
    }

    // Flush what handlers queued before the loop ended, e.g. a final QUIT.
    while let Ok(line) = outbox.try_recv() {
        if transport.send(&line).await.is_err() {
            break;
        }
    }
    if let Err(e) = transport.close().await {
        debug!(error = %e, "transport close failed");
    }
    shared.set_state(ConnectionState::Closed);
    shared.finish_handshake(Err(ConnectError::Closed));
}
