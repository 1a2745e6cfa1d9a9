//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Largest accepted `security.reconnect_window_secs` (one day).
pub const MAX_RECONNECT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("upstream.host is required")]
    MissingUpstreamHost,
    #[error("upstream.port must be non-zero")]
    InvalidUpstreamPort,
    #[error("security.reconnect_window_secs must be non-zero")]
    ZeroReconnectWindow,
    #[error("security.reconnect_window_secs must be at most {MAX_RECONNECT_WINDOW_SECS}, got {0}")]
    ReconnectWindowTooLarge(u64),
    #[error("security.handshake_timeout_secs must be non-zero")]
    ZeroHandshakeTimeout,
    #[error("listen.tls.cert_path does not exist: {0}")]
    TlsCertNotFound(String),
    #[error("listen.tls.key_path does not exist: {0}")]
    TlsKeyNotFound(String),
}

impl Config {
    /// Validate the configuration, returning all errors found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.upstream.host.trim().is_empty() {
            errors.push(ValidationError::MissingUpstreamHost);
        }
        if self.upstream.port == 0 {
            errors.push(ValidationError::InvalidUpstreamPort);
        }
        if self.security.reconnect_window_secs == 0 {
            errors.push(ValidationError::ZeroReconnectWindow);
        } else if self.security.reconnect_window_secs > MAX_RECONNECT_WINDOW_SECS {
            errors.push(ValidationError::ReconnectWindowTooLarge(
                self.security.reconnect_window_secs,
            ));
        }
        if self.security.handshake_timeout_secs == 0 {
            errors.push(ValidationError::ZeroHandshakeTimeout);
        }

        if let Some(ref tls) = self.listen.tls {
            if !Path::new(&tls.cert_path).exists() {
                errors.push(ValidationError::TlsCertNotFound(tls.cert_path.clone()));
            }
            if !Path::new(&tls.key_path).exists() {
                errors.push(ValidationError::TlsKeyNotFound(tls.key_path.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        let config = parse(
            r#"
[listen]
address = "127.0.0.1:8080"

[upstream]
host = "irc.example.net"
"#,
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_fail() {
        let config = parse(
            r#"
[listen]
address = "127.0.0.1:8080"

[upstream]
host = " "
port = 0

[security]
reconnect_window_secs = 0
handshake_timeout_secs = 0
"#,
        );
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingUpstreamHost)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidUpstreamPort)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroReconnectWindow)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroHandshakeTimeout)));
    }

    #[test]
    fn test_oversized_reconnect_window_fails() {
        let config = parse(&format!(
            r#"
[listen]
address = "127.0.0.1:8080"

[upstream]
host = "irc.example.net"

[security]
reconnect_window_secs = {}
"#,
            u64::MAX / 2
        ));
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ValidationError::ReconnectWindowTooLarge(secs) if secs == u64::MAX / 2
        ));

        let mut config = config;
        config.security.reconnect_window_secs = MAX_RECONNECT_WINDOW_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_tls_files_fail() {
        let config = parse(
            r#"
[listen]
address = "127.0.0.1:8443"

[listen.tls]
cert_path = "/nonexistent/cert.pem"
key_path = "/nonexistent/key.pem"

[upstream]
host = "irc.example.net"
"#,
        );
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TlsCertNotFound(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TlsKeyNotFound(_))));
    }
}
