//! SSRF guard for outgoing requests
//!
//! Every host is checked after normalization and before any network call.
//! Literal addresses are matched against non-routable CIDR ranges; hostnames
//! are matched against internal-only names and, just before fetching, against
//! the addresses they resolve to.

use hyper::client::connect::dns::Name;
use ipnet::IpNet;
use reqwest::dns::{Addrs, Resolve, Resolving};
use std::collections::HashSet;
use std::error::Error as StdError;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static BLOCKED_NETWORKS: LazyLock<Vec<IpNet>> = LazyLock::new(|| {
    [
        "0.0.0.0/8",          // "this" network
        "10.0.0.0/8",         // RFC1918
        "100.64.0.0/10",      // carrier-grade NAT
        "127.0.0.0/8",        // loopback
        "169.254.0.0/16",     // link-local / cloud metadata
        "172.16.0.0/12",      // RFC1918
        "192.0.0.0/24",       // IETF protocol assignments
        "192.0.2.0/24",       // TEST-NET-1
        "192.168.0.0/16",     // RFC1918
        "198.18.0.0/15",      // benchmarking
        "198.51.100.0/24",    // TEST-NET-2
        "203.0.113.0/24",     // TEST-NET-3
        "224.0.0.0/4",        // multicast
        "240.0.0.0/4",        // reserved + broadcast
        "::/128",             // unspecified
        "::1/128",            // loopback
        "fc00::/7",           // unique-local
        "fe80::/10",          // link-local
        "ff00::/8",           // multicast
        "2001:db8::/32",      // documentation
    ]
    .iter()
    .map(|cidr| cidr.parse().expect("BUG: hardcoded CIDR is invalid"))
    .collect()
});

const BLOCKED_NAMES: &[&str] = &["localhost", "metadata.google.internal", "instance-data"];

const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".internal", ".local", ".localdomain"];

/// Returns true for addresses that must never be fetched
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    };

    BLOCKED_NETWORKS.iter().any(|net| net.contains(&ip))
}

/// Returns true when a hostname points at loopback, private, link-local,
/// unique-local, carrier-grade NAT, or other non-routable space
///
/// Only literal addresses and well-known internal names can be judged here;
/// [`HostGuard::resolves_to_blocked`] covers names that resolve inward.
///
/// # Examples
///
/// ```
/// use docsift::url::is_blocked_host;
///
/// assert!(is_blocked_host("127.0.0.1"));
/// assert!(is_blocked_host("169.254.169.254"));
/// assert!(is_blocked_host("[fe80::1]"));
/// assert!(!is_blocked_host("docs.python.org"));
/// ```
pub fn is_blocked_host(hostname: &str) -> bool {
    let host = hostname
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if host.is_empty() {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_blocked_ip(ip);
    }

    BLOCKED_NAMES.contains(&host.as_str())
        || BLOCKED_SUFFIXES.iter().any(|suffix| host.ends_with(suffix))
}

/// A hostname that resolved into blocked address space
#[derive(Debug, Error)]
#[error("{host} resolves to blocked address {addr}")]
pub struct BlockedAddress {
    pub host: String,
    pub addr: IpAddr,
}

/// Host guard with an operator-controlled allow list
///
/// Cheap to clone; the redirect policy of the HTTP client holds its own copy.
#[derive(Debug, Clone, Default)]
pub struct HostGuard {
    allow_hosts: Arc<HashSet<String>>,
}

impl HostGuard {
    pub fn new<S: AsRef<str>>(allow_hosts: &[S]) -> Self {
        Self {
            allow_hosts: Arc::new(
                allow_hosts
                    .iter()
                    .map(|h| h.as_ref().trim().to_ascii_lowercase())
                    .collect(),
            ),
        }
    }

    fn is_allowed(&self, host: &str) -> bool {
        self.allow_hosts.contains(&host.to_ascii_lowercase())
    }

    /// Synchronous check against literal addresses and internal names
    pub fn is_blocked(&self, host: &str) -> bool {
        !self.is_allowed(host) && is_blocked_host(host)
    }

    /// Resolves a hostname and reports whether any address is blocked
    ///
    /// Literal IPs and allow-listed hosts return `Ok(false)` without a lookup,
    /// since [`HostGuard::is_blocked`] already judged them.
    pub async fn resolves_to_blocked(&self, host: &str, port: u16) -> std::io::Result<bool> {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if self.is_allowed(host) || bare.parse::<IpAddr>().is_ok() {
            return Ok(false);
        }

        let mut addrs = tokio::net::lookup_host((bare, port)).await?;
        Ok(addrs.any(|addr| is_blocked_ip(addr.ip())))
    }

    /// Passes resolved addresses through unless one of them is blocked
    pub fn screen_addrs(
        &self,
        host: &str,
        addrs: Vec<SocketAddr>,
    ) -> Result<Vec<SocketAddr>, BlockedAddress> {
        if self.is_allowed(host) {
            return Ok(addrs);
        }
        match addrs.iter().find(|addr| is_blocked_ip(addr.ip())) {
            Some(addr) => Err(BlockedAddress {
                host: host.to_string(),
                addr: addr.ip(),
            }),
            None => Ok(addrs),
        }
    }
}

/// The HTTP client resolves every connection through the guard
///
/// This covers the first request, each redirect hop, and names that change
/// their answer between the pre-fetch check and the connect.
impl Resolve for HostGuard {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(guarded_lookup(self.clone(), name.as_str().to_string()))
    }
}

async fn guarded_lookup(
    guard: HostGuard,
    host: String,
) -> Result<Addrs, Box<dyn StdError + Send + Sync>> {
    // Port is filled in by the connector
    let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
    let addrs = guard.screen_addrs(&host, resolved)?;
    Ok(Box::new(addrs.into_iter()))
}
