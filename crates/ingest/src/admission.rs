// ABOUTME: URL admission gate that validates syntax and scheme, then resolves and vets the host.
// ABOUTME: Rejects any target that is, or resolves to, a private, loopback, or link-local address.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use tracing::debug;
use url::{Host, Url};

use crate::address::{is_non_routable, is_non_routable_ip};
use crate::error::{ErrorCode, IngestError};

/// Hostname resolution used by the admission gate.
#[async_trait]
pub trait Resolve: fmt::Debug + Send + Sync {
    /// Combined A/AAAA lookup.
    async fn lookup(&self, host: &str) -> anyhow::Result<Vec<IpAddr>>;

    /// IPv4-only lookup, tried when the combined lookup fails.
    async fn lookup_ipv4(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        let addrs = self.lookup(host).await?;
        Ok(addrs.into_iter().filter(IpAddr::is_ipv4).collect())
    }
}

/// Resolver backed by the operating system via `tokio::net::lookup_host`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|sa| sa.ip()).collect())
    }

    async fn lookup_ipv4(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        // the port form goes through a separate getaddrinfo call
        let addrs = tokio::net::lookup_host(format!("{}:80", host)).await?;
        Ok(addrs.map(|sa| sa.ip()).filter(IpAddr::is_ipv4).collect())
    }
}

/// Fixed host-to-address table. Unknown hosts fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the addresses a host resolves to.
    pub fn with_host(mut self, host: impl Into<String>, addrs: Vec<IpAddr>) -> Self {
        self.hosts.insert(host.into().to_lowercase(), addrs);
        self
    }
}

#[async_trait]
impl Resolve for StaticResolver {
    async fn lookup(&self, host: &str) -> anyhow::Result<Vec<IpAddr>> {
        self.hosts
            .get(&host.to_lowercase())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no addresses registered for {}", host))
    }
}

/// Decide whether a raw URL may be fetched.
///
/// Checks run cheapest first: parse, scheme, hostname, then DNS. With
/// `allow_private_networks` set, only the parse and scheme checks apply.
pub async fn admit(
    raw: &str,
    resolver: &dyn Resolve,
    allow_private_networks: bool,
) -> Result<Url, IngestError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IngestError::invalid_format(raw, None));
    }

    let url = Url::parse(trimmed).map_err(|e| {
        IngestError::invalid_format(raw, Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(IngestError::new(
            ErrorCode::UnsupportedScheme,
            raw,
            "Admit",
            Some(anyhow::anyhow!("scheme {} is not http or https", scheme)),
        ));
    }

    let host = match url.host() {
        Some(host) => host,
        None => {
            return Err(IngestError::invalid_format(
                raw,
                Some(anyhow::anyhow!("URL has no host")),
            ))
        }
    };

    if allow_private_networks {
        return Ok(url);
    }

    let addrs = match host {
        Host::Ipv4(ip) => vec![IpAddr::V4(ip)],
        Host::Ipv6(ip) => vec![IpAddr::V6(ip)],
        Host::Domain(name) => {
            let name = name.trim_end_matches('.').to_lowercase();
            if name == "localhost" || name.ends_with(".local") || is_non_routable(&name) {
                return Err(IngestError::private_target(
                    raw,
                    Some(anyhow::anyhow!("host {} is local", name)),
                ));
            }
            resolve_host(raw, &name, resolver).await?
        }
    };

    for addr in &addrs {
        if is_non_routable_ip(addr) {
            return Err(IngestError::private_target(
                raw,
                Some(anyhow::anyhow!("{} is a private address", addr)),
            ));
        }
    }

    debug!(url = %url, addresses = addrs.len(), "admitted");
    Ok(url)
}

async fn resolve_host(
    raw: &str,
    host: &str,
    resolver: &dyn Resolve,
) -> Result<Vec<IpAddr>, IngestError> {
    let addrs = match resolver.lookup(host).await {
        Ok(addrs) => addrs,
        Err(combined_err) => {
            debug!(host, error = %combined_err, "combined lookup failed, trying IPv4 only");
            resolver.lookup_ipv4(host).await.map_err(|e| {
                IngestError::new(
                    ErrorCode::UnresolvableHost,
                    raw,
                    "Admit",
                    Some(anyhow::anyhow!("DNS lookup failed: {}", e)),
                )
            })?
        }
    };

    if addrs.is_empty() {
        return Err(IngestError::new(
            ErrorCode::UnresolvableHost,
            raw,
            "Admit",
            Some(anyhow::anyhow!("no addresses for {}", host)),
        ));
    }
    Ok(addrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn public_resolver() -> StaticResolver {
        StaticResolver::new()
            .with_host("example.com", vec!["93.184.216.34".parse().unwrap()])
            .with_host(
                "rebind.example",
                vec!["93.184.216.34".parse().unwrap(), "10.0.0.5".parse().unwrap()],
            )
            .with_host("internal.example", vec!["10.0.0.5".parse().unwrap()])
            .with_host("mapped.example", vec!["::ffff:127.0.0.1".parse().unwrap()])
            .with_host("empty.example", vec![])
    }

    /// Fails the combined lookup and answers the IPv4-only one.
    #[derive(Debug, Default)]
    struct V4OnlyResolver {
        v4_calls: AtomicUsize,
    }

    #[async_trait]
    impl Resolve for V4OnlyResolver {
        async fn lookup(&self, _host: &str) -> anyhow::Result<Vec<IpAddr>> {
            Err(anyhow::anyhow!("AAAA query refused"))
        }

        async fn lookup_ipv4(&self, _host: &str) -> anyhow::Result<Vec<IpAddr>> {
            self.v4_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["1.1.1.1".parse().unwrap()])
        }
    }

    async fn code_of(raw: &str) -> ErrorCode {
        admit(raw, &public_resolver(), false)
            .await
            .expect_err("should be rejected")
            .code
    }

    #[tokio::test]
    async fn admits_public_host() {
        let url = admit("https://example.com/about", &public_resolver(), false)
            .await
            .expect("public host should be admitted");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[tokio::test]
    async fn rejects_malformed_urls() {
        assert_eq!(code_of("").await, ErrorCode::InvalidFormat);
        assert_eq!(code_of("   ").await, ErrorCode::InvalidFormat);
        assert_eq!(code_of("example.com").await, ErrorCode::InvalidFormat);
        assert_eq!(code_of("http://").await, ErrorCode::InvalidFormat);
    }

    #[tokio::test]
    async fn rejects_out_of_range_quads() {
        assert!(!is_non_routable("10.0.0.256"));
        assert_eq!(code_of("http://10.0.0.256/").await, ErrorCode::InvalidFormat);
        assert_eq!(code_of("http://192.168.1.999:8080/").await, ErrorCode::InvalidFormat);

        let err = admit("http://10.0.0.256/", &StaticResolver::new(), false)
            .await
            .expect_err("ill-formed quad must not be admitted");
        assert!(err.is_admission());
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        assert_eq!(code_of("ftp://example.com").await, ErrorCode::UnsupportedScheme);
        assert_eq!(code_of("file:///etc/passwd").await, ErrorCode::UnsupportedScheme);
        assert_eq!(code_of("mailto:a@example.com").await, ErrorCode::UnsupportedScheme);
    }

    #[tokio::test]
    async fn rejects_local_hosts_without_dns() {
        assert_eq!(code_of("http://localhost/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://LOCALHOST.:8080/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://printer.local/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://127.0.0.1/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://[::1]/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://[fe80::1]/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://169.254.169.254/latest").await, ErrorCode::PrivateOrLocalTarget);
    }

    #[tokio::test]
    async fn rejects_numeric_host_encodings() {
        // the URL parser normalizes these to 127.0.0.1
        assert_eq!(code_of("http://2130706433/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("http://0x7f.0.0.1/").await, ErrorCode::PrivateOrLocalTarget);
    }

    #[tokio::test]
    async fn rejects_hosts_resolving_to_private_addresses() {
        assert_eq!(code_of("https://internal.example/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("https://rebind.example/").await, ErrorCode::PrivateOrLocalTarget);
        assert_eq!(code_of("https://mapped.example/").await, ErrorCode::PrivateOrLocalTarget);
    }

    #[tokio::test]
    async fn unresolvable_hosts() {
        assert_eq!(code_of("https://nowhere.example/").await, ErrorCode::UnresolvableHost);
        assert_eq!(code_of("https://empty.example/").await, ErrorCode::UnresolvableHost);
    }

    #[tokio::test]
    async fn falls_back_to_ipv4_lookup() {
        let resolver = V4OnlyResolver::default();
        let url = admit("https://dual.example/", &resolver, false)
            .await
            .expect("IPv4 fallback should admit");
        assert_eq!(url.host_str(), Some("dual.example"));
        assert_eq!(resolver.v4_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn allow_private_networks_skips_host_checks() {
        let url = admit("http://127.0.0.1:8080/", &StaticResolver::new(), true)
            .await
            .expect("private networks allowed");
        assert_eq!(url.port(), Some(8080));

        let err = admit("gopher://127.0.0.1/", &StaticResolver::new(), true)
            .await
            .expect_err("scheme still checked");
        assert_eq!(err.code, ErrorCode::UnsupportedScheme);
    }
}
