//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::listen::ListenConfig;
use super::security::SecurityConfig;
use super::upstream::UpstreamConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// WebSocket listener.
    pub listen: ListenConfig,
    /// IRC server peers are bridged to.
    pub upstream: UpstreamConfig,
    /// Throttling and verification.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Log output.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_minimal_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[listen]
address = "127.0.0.1:8080"

[upstream]
host = "irc.example.net"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.listen.address.port(), 8080);
        assert_eq!(config.upstream.host, "irc.example.net");
        assert_eq!(config.security.reconnect_window_secs, 15);
        assert_eq!(config.security.handshake_timeout_secs, 10);
        assert!(!config.security.verify_reverse_dns);
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[listen]
address = "0.0.0.0:8443"
allow_origins = ["https://chat.example.net"]

[upstream]
host = "irc.example.net"
port = 6697
tls = true
allow_client_target = true

[security]
reconnect_window_secs = 30
verify_reverse_dns = true

[log]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.upstream.tls);
        assert!(config.upstream.allow_client_target);
        assert_eq!(config.security.reconnect_window_secs, 30);
        assert!(config.security.verify_reverse_dns);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn missing_upstream_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[listen]\naddress = \"127.0.0.1:8080\"\n").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
