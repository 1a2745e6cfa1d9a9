//! Security module for the relay.
//!
//! Provides the two checks a peer passes before the relay opens an
//! outbound connection on its behalf:
//! - **Reconnect ledger**: refuses a source IP that reconnects inside the
//!   configured window, and sweeps stale entries periodically
//! - **FCrDNS**: optional forward-confirmed reverse DNS of the peer address
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               Security Module                │
//! ├─────────────────────────┬────────────────────┤
//! │     ReconnectLedger     │       FCrDNS       │
//! │ DashMap<IpAddr,Instant> │  PTR -> A/AAAA     │
//! │  sweep every 5 windows  │  hickory-resolver  │
//! └─────────────────────────┴────────────────────┘
//! ```

pub mod fcrdns;
pub mod reconnect;

pub use fcrdns::{HickoryResolver, HostResolver, LookupError, VerifyError};
pub use reconnect::{ReconnectLedger, Throttled};
