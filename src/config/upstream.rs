//! The IRC server behind the relay.

use ircws_proto::ProxyTarget;
use serde::Deserialize;

use super::defaults::{default_true, default_upstream_port};

/// Upstream IRC server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Hostname or address of the IRC server.
    pub host: String,
    /// TCP port (default: 6667).
    #[serde(default = "default_upstream_port")]
    pub port: u16,
    /// Connect with TLS.
    #[serde(default)]
    pub tls: bool,
    /// Verify the server certificate against the system roots (default: true).
    /// Only disable this for self-signed test servers.
    #[serde(default = "default_true")]
    pub verify_certificates: bool,
    /// Let peers pick any host/port in their handshake.
    /// When false the relay only ever connects to `host:port`.
    #[serde(default)]
    pub allow_client_target: bool,
}

impl UpstreamConfig {
    /// The configured target.
    pub fn target(&self) -> ProxyTarget {
        ProxyTarget::new(self.host.clone(), self.port, self.tls)
    }

    /// Decide where a peer's handshake request actually goes.
    ///
    /// Returns `None` when the request names a server this relay will not
    /// bridge to. With a fixed target the configured TLS setting wins over
    /// the peer's.
    pub fn resolve(&self, requested: &ProxyTarget) -> Option<ProxyTarget> {
        if self.allow_client_target {
            return Some(requested.clone());
        }
        let same_host = requested.host.eq_ignore_ascii_case(&self.host);
        (same_host && requested.port == self.port).then(|| self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> UpstreamConfig {
        toml::from_str(
            r#"
host = "irc.example.net"
port = 6697
tls = true
"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults() {
        let config: UpstreamConfig = toml::from_str(r#"host = "irc.example.net""#).unwrap();
        assert_eq!(config.port, 6667);
        assert!(!config.tls);
        assert!(config.verify_certificates);
        assert!(!config.allow_client_target);
    }

    #[test]
    fn fixed_target_accepts_matching_request() {
        let config = fixed();
        let resolved = config
            .resolve(&ProxyTarget::new("IRC.example.net", 6697, false))
            .unwrap();
        assert_eq!(resolved, ProxyTarget::new("irc.example.net", 6697, true));
    }

    #[test]
    fn fixed_target_rejects_other_servers() {
        let config = fixed();
        assert!(config.resolve(&ProxyTarget::new("evil.example", 6697, true)).is_none());
        assert!(config.resolve(&ProxyTarget::new("irc.example.net", 6667, true)).is_none());
    }

    #[test]
    fn open_target_passes_request_through() {
        let config = UpstreamConfig {
            allow_client_target: true,
            ..fixed()
        };
        let requested = ProxyTarget::new("irc.other.org", 7000, false);
        assert_eq!(config.resolve(&requested), Some(requested));
    }
}
