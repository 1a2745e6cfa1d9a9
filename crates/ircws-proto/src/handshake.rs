//! Relay handshake frames.
//!
//! Before any IRC text flows, the peer names the IRC server it wants in a
//! single JSON text frame and the relay acknowledges once the outbound
//! connection is under way:
//!
//! ```text
//! peer  -> relay   {"type":"proxy","host":"irc.example.net","port":6697,"tls":true}
//! relay -> peer    {"type":"ready"}
//! ```
//!
//! Every later frame carries raw IRC text.

use serde::{Deserialize, Serialize};

/// The IRC server a peer asks the relay to bridge to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTarget {
    /// Hostname or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Wrap the outbound connection in TLS.
    #[serde(default)]
    pub tls: bool,
}

impl ProxyTarget {
    /// Build a target.
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }
}

/// Frames sent by the peer during the handshake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PeerFrame {
    /// Open a bridge to the given server.
    Proxy(ProxyTarget),
}

/// Frames sent by the relay during the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayFrame {
    /// The outbound connection is up; raw IRC text follows.
    Ready,
}
