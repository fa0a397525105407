use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking or analytics identifiers
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "dclid",
    "gbraid",
    "wbraid",
    "msclkid",
    "yclid",
    "igshid",
    "mc_eid",
    "mc_cid",
    "_ga",
    "_gl",
    "_hsenc",
    "_hsmi",
    "ref",
    "ref_src",
];

/// Normalizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http and https
/// 3. Lowercase the host and strip trailing dots
/// 4. Drop credentials and default ports (80 for http, 443 for https)
/// 5. Normalize path:
///    - Remove dot segments and repeated slashes
///    - Remove a single trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Remove fragment
/// 7. Remove tracking query parameters
/// 8. Sort remaining query parameters and re-encode them
/// 9. Remove an empty query string
///
/// Normalization is idempotent: feeding the output back in returns the same
/// string, so canonical URLs can be compared with plain string equality.
///
/// # Examples
///
/// ```
/// use docsift::url::normalize_url;
///
/// let url = normalize_url("https://Docs.Python.ORG:443/3/tutorial/?utm_source=x#intro").unwrap();
/// assert_eq!(url.as_str(), "https://docs.python.org/3/tutorial");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let normalized_host = host.to_lowercase().trim_end_matches('.').to_string();
    if normalized_host.is_empty() {
        return Err(UrlError::MissingHost);
    }
    if normalized_host != host {
        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    }

    if !url.username().is_empty() || url.password().is_some() {
        url.set_username("")
            .and_then(|_| url.set_password(None))
            .map_err(|_| UrlError::Malformed("Failed to strip credentials".to_string()))?;
    }

    if matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        url.set_port(None)
            .map_err(|_| UrlError::Malformed("Failed to drop default port".to_string()))?;
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Ok(url)
}

/// Canonical string form of a URL, or `None` when it must be dropped
///
/// Callers treat `None` as "do not enqueue".
pub fn normalize(url_str: &str) -> Option<String> {
    normalize_url(url_str).ok().map(String::from)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the remaining ones by key, then value
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_scheme() {
        let result = normalize_url("http://example.com/page").unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_strip_trailing_dot() {
        let result = normalize_url("https://docs.python.org./3/").unwrap();
        assert_eq!(result.as_str(), "https://docs.python.org/3");
    }

    #[test]
    fn test_default_ports_removed() {
        assert_eq!(
            normalize("http://example.com:80/a").as_deref(),
            Some("http://example.com/a")
        );
        assert_eq!(
            normalize("https://example.com:443/a").as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(
            normalize("https://example.com:8443/a").as_deref(),
            Some("https://example.com:8443/a")
        );
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(
            normalize("https://example.com/").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(
            normalize("https://example.com").as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize_url(
            "https://example.com/page?keep=yes&utm_medium=email&another=value&fbclid=123&ref=hn",
        )
        .unwrap();
        assert_eq!(
            result.as_str(),
            "https://example.com/page?another=value&keep=yes"
        );
    }

    #[test]
    fn test_all_tracking_params_removed() {
        for param in TRACKING_PARAMS.iter().chain(["utm_source", "utm_custom"].iter()) {
            let url = format!("https://example.com/page?{}=value", param);
            assert_eq!(
                normalize(&url).as_deref(),
                Some("https://example.com/page"),
                "Failed to remove {}",
                param
            );
        }
    }

    #[test]
    fn test_dot_segments_and_slashes() {
        assert_eq!(
            normalize("https://example.com/a/../b/./c").as_deref(),
            Some("https://example.com/b/c")
        );
        assert_eq!(
            normalize("https://example.com///path//to///page").as_deref(),
            Some("https://example.com/path/to/page")
        );
    }

    #[test]
    fn test_credentials_dropped() {
        assert_eq!(
            normalize("https://user:pw@example.com/a").as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(matches!(
            normalize_url("ftp://example.com/page"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert_eq!(normalize("javascript:alert(1)"), None);
        assert_eq!(normalize("mailto:someone@example.com"), None);
        assert_eq!(normalize("file:///etc/passwd"), None);
    }

    #[test]
    fn test_malformed_returns_none() {
        assert_eq!(normalize("not a url"), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("http://"), None);
    }

    #[test]
    fn test_trailing_slash_variants_share_key() {
        assert_eq!(normalize("http://x.org/a"), normalize("http://x.org/a/"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "http://WWW.Example.COM:80/a/../b/?utm_source=x&b=2&a=1#frag",
            "https://example.com/path%20with%20space/?q=a%26b&z=",
            "https://example.com/?q=hello+world&q=again",
            "https://docs.python.org./3/library/os.path.html",
            "https://[::1]:8080/x/",
            "http://example.com/a?flag",
            "https://example.com/%7Euser/",
            "https://example.com/a?b=%3D%3D&a=1&utm_term=zzz",
        ];

        for input in inputs {
            let once = normalize(input).unwrap_or_else(|| panic!("{} should normalize", input));
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for {}", input);
        }
    }
}
