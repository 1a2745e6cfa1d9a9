//! Logging bootstrap and span constructors.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Standardized span constructors for relay observability.
pub mod spans {
    use std::net::IpAddr;
    use tracing::{Span, field, info_span};

    /// Span for one peer session. `host` is filled in once reverse DNS
    /// confirms it.
    pub fn connection(id: &str, ip: IpAddr) -> Span {
        info_span!("connection", id = %id, ip = %ip, host = field::Empty)
    }
}
