//! Unified error handling for the relay.
//!
//! Every way a bridged session can end early maps to one [`RelayError`],
//! with a static label for logs and, where the peer deserves an explanation,
//! an IRC `ERROR` line it can show before the socket closes.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::security::{Throttled, VerifyError};

/// Errors that end a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("reconnecting too fast, retry in {:?}", .0.retry_after)]
    Throttled(#[from] Throttled),

    #[error("no handshake within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),

    #[error("peer closed before the handshake")]
    PeerClosed,

    #[error("target {host}:{port} not allowed")]
    TargetNotAllowed { host: String, port: u16 },

    #[error("reverse DNS verification failed: {0}")]
    Verification(#[from] VerifyError),

    #[error("cannot reach {target}: {source}")]
    Upstream {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl RelayError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Throttled(_) => "throttled",
            Self::HandshakeTimeout(_) => "handshake_timeout",
            Self::InvalidHandshake(_) => "invalid_handshake",
            Self::PeerClosed => "peer_closed",
            Self::TargetNotAllowed { .. } => "target_not_allowed",
            Self::Verification(_) => "verification_failed",
            Self::Upstream { .. } => "upstream_unreachable",
            Self::InvalidServerName(_) => "invalid_server_name",
            Self::WebSocket(_) => "websocket_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Convert to the IRC `ERROR` line sent to the peer before closing.
    ///
    /// Returns `None` when the peer is gone or there is nothing useful to say.
    pub fn to_irc_line(&self) -> Option<String> {
        let text = match self {
            Self::Throttled(_) => "Trying to reconnect too fast.",
            Self::HandshakeTimeout(_) => "Handshake timed out.",
            Self::InvalidHandshake(_) => "Invalid handshake.",
            Self::TargetNotAllowed { .. } => "Target server not allowed.",
            Self::Verification(_) => "Reverse DNS verification failed.",
            Self::Upstream { .. } | Self::InvalidServerName(_) => {
                "Could not connect to the IRC server."
            }

            Self::PeerClosed => return None,
            Self::WebSocket(_) => return None,
            Self::Io(_) => return None,
        };
        Some(format!("ERROR :{text}\r\n"))
    }

    /// Expected peer behaviour rather than a relay fault.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            Self::Throttled(_)
                | Self::HandshakeTimeout(_)
                | Self::InvalidHandshake(_)
                | Self::PeerClosed
                | Self::TargetNotAllowed { .. }
        )
    }
}
