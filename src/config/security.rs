//! Security configuration for reconnect throttling and peer verification.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{default_handshake_timeout_secs, default_reconnect_window_secs};

/// Security configuration for reconnect throttling and peer verification.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Minimum time between two connections from the same IP (default: 15).
    #[serde(default = "default_reconnect_window_secs")]
    pub reconnect_window_secs: u64,
    /// Require forward-confirmed reverse DNS for every peer.
    /// Peers that fail the check are rejected.
    #[serde(default)]
    pub verify_reverse_dns: bool,
    /// Time a peer has to send its handshake frame, and the relay has to
    /// reach the IRC server (default: 10).
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            reconnect_window_secs: default_reconnect_window_secs(),
            verify_reverse_dns: false,
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

impl SecurityConfig {
    pub fn reconnect_window(&self) -> Duration {
        Duration::from_secs(self.reconnect_window_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}
