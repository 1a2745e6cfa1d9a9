//! Gateway - WebSocket listener that accepts relay sessions.
//!
//! The Gateway binds the listener and spawns one session task per
//! incoming peer. Supports both `ws://` and `wss://`.

use crate::config::{Config, TlsConfig};
use crate::network::session::{self, Relay};
use crate::network::upstream::UpstreamConnector;
use crate::security::{HickoryResolver, HostResolver, ReconnectLedger};
use crate::telemetry::spans;
use rustls_pemfile::{certs, pkcs8_private_keys};
use std::io::{BufReader, Cursor};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::{Instrument, error, info, instrument, warn};
use uuid::Uuid;

/// The Gateway accepts incoming WebSocket connections and spawns sessions.
pub struct Gateway {
    listener: TcpListener,
    tls_acceptor: Option<TlsAcceptor>,
    relay: Relay,
}

impl Gateway {
    /// Bind the gateway to the configured listen address.
    pub async fn bind(config: &Config) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen.address).await?;
        let tls_acceptor = match &config.listen.tls {
            Some(tls) => Some(Self::load_tls(tls)?),
            None => None,
        };
        info!(
            address = %listener.local_addr()?,
            tls = tls_acceptor.is_some(),
            "WebSocket listener bound"
        );

        let resolver: Option<Arc<dyn HostResolver>> = if config.security.verify_reverse_dns {
            info!("Forward-confirmed reverse DNS enabled");
            Some(Arc::new(HickoryResolver::new()))
        } else {
            None
        };

        Ok(Self {
            listener,
            tls_acceptor,
            relay: Relay {
                upstream: config.upstream.clone(),
                security: config.security.clone(),
                allow_origins: config.listen.allow_origins.clone(),
                ledger: Arc::new(ReconnectLedger::new(config.security.reconnect_window())),
                resolver,
                connector: UpstreamConnector::new(config.upstream.verify_certificates),
            },
        })
    }

    /// Verify every peer with `resolver`, whatever the configuration says.
    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.relay.resolver = Some(resolver);
        self
    }

    /// The bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The reconnect ledger shared by all sessions.
    pub fn ledger(&self) -> Arc<ReconnectLedger> {
        Arc::clone(&self.relay.ledger)
    }

    /// Load TLS certificates and create TlsAcceptor.
    fn load_tls(config: &TlsConfig) -> anyhow::Result<TlsAcceptor> {
        // Load certificates
        let cert_file = std::fs::read(&config.cert_path)?;
        let cert_reader = &mut BufReader::new(Cursor::new(cert_file));
        let certs: Vec<CertificateDer> = certs(cert_reader).collect::<Result<Vec<_>, _>>()?;

        if certs.is_empty() {
            anyhow::bail!("No certificates found in {}", config.cert_path);
        }

        // Load private key
        let key_file = std::fs::read(&config.key_path)?;
        let key_reader = &mut BufReader::new(Cursor::new(key_file));
        let mut keys: Vec<PrivateKeyDer> = pkcs8_private_keys(key_reader)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(PrivateKeyDer::from)
            .collect();

        if keys.is_empty() {
            anyhow::bail!("No private keys found in {}", config.key_path);
        }

        let key = keys.remove(0);

        let tls_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(TlsAcceptor::from(Arc::new(tls_config)))
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        let relay = Arc::new(self.relay);
        let _sweeper = relay.ledger.spawn_sweeper();
        info!(
            window = ?relay.ledger.window(),
            sweep = ?relay.ledger.sweep_period(),
            "Reconnect ledger sweeper started"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let relay = Arc::clone(&relay);
                    let acceptor = self.tls_acceptor.clone();
                    let span = spans::connection(&Uuid::new_v4().to_string(), addr.ip());

                    tokio::spawn(
                        async move {
                            info!(%addr, "connection accepted");
                            let result = match acceptor {
                                Some(acceptor) => match acceptor.accept(stream).await {
                                    Ok(tls_stream) => session::serve(tls_stream, addr, relay).await,
                                    Err(e) => {
                                        warn!(%addr, error = %e, "TLS handshake failed");
                                        return;
                                    }
                                },
                                None => session::serve(stream, addr, relay).await,
                            };

                            match result {
                                Ok(()) => info!(%addr, "session closed"),
                                Err(e) if e.is_peer_fault() => {
                                    info!(%addr, code = e.error_code(), error = %e, "session refused")
                                }
                                Err(e) => {
                                    warn!(%addr, code = e.error_code(), error = %e, "session failed")
                                }
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
