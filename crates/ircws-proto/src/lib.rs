//! # ircws-proto
//!
//! The client half of ircws: an IRC protocol engine that runs on top of an
//! opaque text [`Transport`] (usually the ircws relay reached over a
//! WebSocket) and derives a structured view of channels and users from the
//! wire traffic.
//!
//! ## Layers
//!
//! - [`EventBus`]: ordered, named publish/subscribe with one-shot and queued
//!   one-shot listeners. Every stateful type exposes its occurrences through
//!   one.
//! - [`FrameReader`]: reassembles complete lines from chunks that arrive at
//!   arbitrary boundaries.
//! - [`Message`]: the parsed form of one IRC line (`FromStr`).
//! - [`Connection`]: owns the transport, registers with the server, answers
//!   keep-alives, records ISUPPORT [`Features`] and dispatches messages.
//! - [`Client`]: channel and user registry built from dispatched commands.
//!
//! ## Quick Start
//!
//! ```rust
//! use ircws_proto::Message;
//!
//! let msg: Message = ":nick!ident@host PRIVMSG #chan :hello world".parse().unwrap();
//! assert_eq!(msg.prefix.as_deref(), Some("nick!ident@host"));
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.params, vec!["#chan", "hello world"]);
//! ```
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), ircws_proto::ConnectError> {
//! use ircws_proto::{Client, Observable, ProxyTarget, WebSocketTransport};
//!
//! let transport = WebSocketTransport::new(
//!     "ws://relay.example.net:8080",
//!     ProxyTarget::new("irc.example.net", 6697, true),
//! );
//! let client = Client::new("rustacean", transport);
//! client.connect().await?;
//!
//! let channel = client.join("#rust", None);
//! channel.on("message", |event| println!("{event:?}"));
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod error;
pub mod event;
pub mod handshake;
pub mod isupport;
pub mod line;
pub mod message;
pub mod prefix;
pub mod response;

#[cfg(feature = "tokio")]
pub mod client;
#[cfg(feature = "tokio")]
pub mod connection;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::error::{MessageParseError, ProtocolError};
pub use self::event::{EventBus, ListenOptions, Observable};
pub use self::handshake::{PeerFrame, ProxyTarget, RelayFrame};
pub use self::isupport::{FeatureValue, Features};
pub use self::line::{FrameReader, MAX_IRC_LINE_LEN};
pub use self::message::Message;
pub use self::prefix::Prefix;
pub use self::response::Response;

#[cfg(feature = "tokio")]
pub use self::client::{
    Channel, ChannelEvent, Client, ClientError, ClientEvent, Target, User, UserEvent, UserInfo,
};
#[cfg(feature = "tokio")]
pub use self::connection::{ConnectError, Connection, ConnectionOptions, ConnectionState};
#[cfg(feature = "tokio")]
pub use self::transport::{
    MemoryPeer, MemoryTransport, Transport, TransportError, WebSocketTransport,
};
