//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: the root `Config`, loading, and `LogConfig`
//! - [`listen`]: WebSocket listener configuration (ListenConfig, TlsConfig)
//! - [`upstream`]: the IRC server the relay bridges to (UpstreamConfig)
//! - [`security`]: reconnect throttling, reverse DNS and handshake limits
//! - [`validation`]: startup checks
//! - [`defaults`]: serde default helpers

mod defaults;
mod listen;
mod security;
mod types;
mod upstream;
mod validation;

pub use listen::{ListenConfig, TlsConfig};
pub use security::SecurityConfig;
pub use types::{Config, ConfigError, LogConfig, LogFormat};
pub use upstream::UpstreamConfig;
pub use validation::ValidationError;
