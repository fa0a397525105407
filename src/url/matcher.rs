/// Checks whether a host is covered by a whitelist
///
/// A host matches an entry when it equals the entry or is a subdomain of it.
/// There is no wildcard or regex syntax; `docs.python.org` covers
/// `docs.python.org` and `www.docs.python.org`, never `evildocs.python.org`
/// or `docs.python.org.evil.com`.
///
/// # Examples
///
/// ```
/// use docsift::url::is_whitelisted;
///
/// let whitelist = ["python.org"];
/// assert!(is_whitelisted("docs.python.org", &whitelist));
/// assert!(is_whitelisted("python.org", &whitelist));
/// assert!(!is_whitelisted("notpython.org", &whitelist));
/// ```
pub fn is_whitelisted<S: AsRef<str>>(hostname: &str, whitelist: &[S]) -> bool {
    let host = canonical_host(hostname);
    if host.is_empty() {
        return false;
    }

    whitelist
        .iter()
        .any(|entry| matches_domain(&canonical_host(entry.as_ref()), &host))
}

/// Exact-or-subdomain match between a domain and a candidate host
pub fn matches_domain(domain: &str, candidate: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    candidate == domain
        || (candidate.len() > domain.len()
            && candidate.ends_with(domain)
            && candidate.as_bytes()[candidate.len() - domain.len() - 1] == b'.')
}

fn canonical_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}
