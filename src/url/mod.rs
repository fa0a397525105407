//! URL handling module for Docsift
//!
//! This module provides URL normalization, host extraction, whitelist
//! matching, and the SSRF guard that every fetch passes through.

mod domain;
mod guard;
mod matcher;
mod normalize;

pub use domain::{extract_host, host_key, origin_of};
pub use guard::{is_blocked_host, is_blocked_ip, BlockedAddress, HostGuard};
pub use matcher::{is_whitelisted, matches_domain};
pub use normalize::{normalize, normalize_url};

use ::url::Url;

/// Why a discovered URL is not eligible for the crawl queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkVerdict {
    /// Canonical, whitelisted, and publicly routable
    Accept,
    /// Could not be normalized (bad syntax or scheme)
    Malformed,
    /// Host is outside the whitelist
    OutOfWhitelist,
    /// Host trips the SSRF guard
    BlockedHost,
}

/// Normalizes a candidate link and classifies it against the whitelist and guard
///
/// The guard runs after normalization, so aliases of an internal address
/// (uppercase hosts, trailing dots, numeric IPv4 forms) are caught too.
pub fn screen_link<S: AsRef<str>>(
    raw: &str,
    whitelist: &[S],
    guard: &HostGuard,
) -> (LinkVerdict, Option<Url>) {
    let url = match normalize_url(raw) {
        Ok(url) => url,
        Err(_) => return (LinkVerdict::Malformed, None),
    };

    let Some(host) = extract_host(&url) else {
        return (LinkVerdict::Malformed, None);
    };

    if !is_whitelisted(&host, whitelist) {
        return (LinkVerdict::OutOfWhitelist, Some(url));
    }

    if guard.is_blocked(&host) {
        return (LinkVerdict::BlockedHost, Some(url));
    }

    (LinkVerdict::Accept, Some(url))
}
