//! WebSocket listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// WebSocket listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080").
    pub address: SocketAddr,
    /// Allowed `Origin` headers (e.g., `["https://example.com"]`).
    /// Empty list allows all origins; `"*"` matches any present origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    /// Serve `wss://` instead of `ws://`.
    pub tls: Option<TlsConfig>,
}

/// TLS settings for the listener.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format).
    pub cert_path: String,
    /// Path to private key file (PEM format, PKCS#8).
    pub key_path: String,
}
