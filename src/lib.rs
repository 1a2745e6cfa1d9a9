//! ircws - WebSocket to IRC relay.
//!
//! Browsers cannot open raw TCP sockets, so a web IRC client talks to this
//! relay over a WebSocket instead. Each peer names the IRC server it wants
//! in a handshake frame, the relay checks it against the reconnect ledger
//! and, optionally, forward-confirmed reverse DNS, then pipes bytes both
//! ways until either side hangs up. IRC itself is never parsed here; the
//! protocol engine lives in `ircws-proto` and runs on the client side.

pub mod config;
pub mod error;
pub mod network;
pub mod security;
pub mod telemetry;

pub use config::Config;
pub use error::RelayError;
pub use network::Gateway;
