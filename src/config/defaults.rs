//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Upstream Defaults
// =============================================================================

pub fn default_upstream_port() -> u16 {
    6667
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_reconnect_window_secs() -> u64 {
    15
}

pub fn default_handshake_timeout_secs() -> u64 {
    10
}
