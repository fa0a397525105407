use url::Url;

/// Extracts the hostname from a URL
///
/// The host is lowercased and stripped of trailing dots. IPv6 literals keep
/// their brackets, matching `Url::host_str`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docsift::url::extract_host;
///
/// let url = Url::parse("https://DOCS.python.org/3/").unwrap();
/// assert_eq!(extract_host(&url), Some("docs.python.org".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| h.to_lowercase().trim_end_matches('.').to_string())
        .filter(|h| !h.is_empty())
}

/// Key used for per-host politeness and robots.txt caching
///
/// Two origins on the same hostname but different explicit ports are
/// different servers, so the port is part of the key when present.
pub fn host_key(url: &Url) -> Option<String> {
    let host = extract_host(url)?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Origin (`scheme://host[:port]`) used to locate robots.txt
pub fn origin_of(url: &Url) -> Option<Url> {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin.host_str()?;
    Some(origin)
}
