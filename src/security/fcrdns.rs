//! Forward-confirmed reverse DNS.
//!
//! The peer's address is reverse-resolved to a hostname, the hostname is
//! resolved forward again, and the first address returned must be the
//! peer's own. Anything else rejects the peer.

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use thiserror::Error;
use tracing::debug;

/// A failed DNS query.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct LookupError(pub String);

/// Why a peer failed verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("reverse lookup of {ip} failed: {source}")]
    Reverse {
        ip: IpAddr,
        #[source]
        source: LookupError,
    },
    #[error("{0} has no PTR record")]
    NoHostname(IpAddr),
    #[error("forward lookup of {host} failed: {source}")]
    Forward {
        host: String,
        #[source]
        source: LookupError,
    },
    #[error("{host} has no addresses")]
    NoAddress { host: String },
    #[error("{host} resolves to {found}, not {ip}")]
    Mismatch {
        ip: IpAddr,
        host: String,
        found: IpAddr,
    },
}

/// DNS queries needed for verification.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// PTR names for `ip`, in answer order.
    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, LookupError>;

    /// A/AAAA addresses for `host`, in answer order.
    async fn forward(&self, host: &str) -> Result<Vec<IpAddr>, LookupError>;
}

/// Verify `ip`, returning its confirmed hostname.
///
/// The first PTR name is forward-resolved and its first address must equal
/// `ip`. IPv4-mapped IPv6 addresses are compared as IPv4.
pub async fn verify(resolver: &dyn HostResolver, ip: IpAddr) -> Result<String, VerifyError> {
    let ip = ip.to_canonical();

    let names = resolver
        .reverse(ip)
        .await
        .map_err(|source| VerifyError::Reverse { ip, source })?;
    let fqdn = names
        .into_iter()
        .next()
        .ok_or(VerifyError::NoHostname(ip))?;
    let host = fqdn.trim_end_matches('.').to_owned();

    let addrs = resolver
        .forward(&fqdn)
        .await
        .map_err(|source| VerifyError::Forward {
            host: host.clone(),
            source,
        })?;
    let found = addrs
        .first()
        .map(|addr| addr.to_canonical())
        .ok_or_else(|| VerifyError::NoAddress { host: host.clone() })?;

    if found != ip {
        return Err(VerifyError::Mismatch { ip, host, found });
    }
    debug!(%ip, %host, "reverse DNS confirmed");
    Ok(host)
}

/// System resolver backed by hickory.
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Resolver using the system configuration, or hickory's defaults when
    /// that cannot be read.
    pub fn new() -> Self {
        // Try system config, fall back to defaults
        let resolver = TokioResolver::builder_tokio()
            .map(|b| b.build())
            .unwrap_or_else(|_| {
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
                .build()
            });
        Self { resolver }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostResolver for HickoryResolver {
    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, LookupError> {
        let lookup = self
            .resolver
            .reverse_lookup(ip)
            .await
            .map_err(|e| LookupError(e.to_string()))?;
        Ok(lookup.iter().map(|ptr| ptr.to_string()).collect())
    }

    async fn forward(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| LookupError(e.to_string()))?;
        Ok(lookup.iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[derive(Default)]
    struct StaticResolver {
        ptr: HashMap<IpAddr, Vec<String>>,
        addrs: HashMap<String, Vec<IpAddr>>,
    }

    #[async_trait]
    impl HostResolver for StaticResolver {
        async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, LookupError> {
            self.ptr
                .get(&ip)
                .cloned()
                .ok_or_else(|| LookupError("NXDOMAIN".into()))
        }

        async fn forward(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
            self.addrs
                .get(host)
                .cloned()
                .ok_or_else(|| LookupError("NXDOMAIN".into()))
        }
    }

    const PEER: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 4));

    fn resolver(host: &str, forward: Vec<IpAddr>) -> StaticResolver {
        let mut resolver = StaticResolver::default();
        resolver.ptr.insert(PEER, vec![host.to_owned()]);
        resolver.addrs.insert(host.to_owned(), forward);
        resolver
    }

    #[tokio::test]
    async fn confirmed_peer_yields_hostname() {
        let resolver = resolver("peer.example.net.", vec![PEER]);
        assert_eq!(verify(&resolver, PEER).await.unwrap(), "peer.example.net");
    }

    #[tokio::test]
    async fn only_first_forward_address_counts() {
        let other = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        let resolver = resolver("peer.example.net.", vec![other, PEER]);
        let err = verify(&resolver, PEER).await.unwrap_err();
        assert!(matches!(err, VerifyError::Mismatch { found, .. } if found == other));
    }

    #[tokio::test]
    async fn missing_ptr_is_rejected() {
        let err = verify(&StaticResolver::default(), PEER).await.unwrap_err();
        assert!(matches!(err, VerifyError::Reverse { .. }));

        let mut empty = StaticResolver::default();
        empty.ptr.insert(PEER, Vec::new());
        let err = verify(&empty, PEER).await.unwrap_err();
        assert!(matches!(err, VerifyError::NoHostname(ip) if ip == PEER));
    }

    #[tokio::test]
    async fn failed_forward_lookup_is_rejected() {
        let mut resolver = StaticResolver::default();
        resolver.ptr.insert(PEER, vec!["ghost.example.".into()]);
        let err = verify(&resolver, PEER).await.unwrap_err();
        assert!(matches!(err, VerifyError::Forward { ref host, .. } if host == "ghost.example"));

        resolver.addrs.insert("ghost.example.".into(), Vec::new());
        let err = verify(&resolver, PEER).await.unwrap_err();
        assert!(matches!(err, VerifyError::NoAddress { .. }));
    }

    #[tokio::test]
    async fn mapped_peer_address_is_canonicalised() {
        let resolver = resolver("peer.example.net.", vec![PEER]);
        let mapped = IpAddr::V6(Ipv4Addr::new(198, 51, 100, 4).to_ipv6_mapped());
        assert!(verify(&resolver, mapped).await.is_ok());

        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);
        assert!(verify(&resolver, v6).await.is_err());
    }
}
