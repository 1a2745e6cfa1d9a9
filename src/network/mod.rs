//! Network module.
//!
//! Contains the Gateway (WebSocket listener), the per-peer session, the
//! byte bridge and the upstream connector.

pub mod bridge;
mod gateway;
mod session;
pub mod upstream;

pub use bridge::Hangup;
pub use gateway::Gateway;
pub use upstream::{UpstreamConnector, UpstreamStream};
