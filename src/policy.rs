//! Origin and host checks shared by the navigation gate and the page bridge.

use url::Url;

/// Extract the origin (scheme + host + port) from a URL string using the
/// WHATWG URL Standard. Returns `None` for malformed URLs or URLs with
/// opaque origins (`file:`, `data:`, `blob:`, custom schemes).
///
/// Scheme and host are lowercased, default ports and userinfo stripped.
pub fn extract_origin(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let serialized = parsed.origin().ascii_serialization();
    // Opaque origins serialize as "null".
    if serialized == "null" {
        return None;
    }
    Some(serialized)
}

/// Check a bridge message's source URL against the trusted origins.
/// An empty list trusts everything; a malformed source is never trusted
/// when a list is configured.
pub fn is_origin_trusted(trusted: &[String], source_url: &str) -> bool {
    if trusted.is_empty() {
        return true;
    }
    match extract_origin(source_url) {
        Some(origin) => trusted.contains(&origin),
        None => false,
    }
}

/// Check whether a URL's host is permitted by an `allowedHosts` list.
///
/// Pattern matching is case-insensitive:
///   - Exact: `"example.com"` matches only `example.com`
///   - Wildcard: `"*.example.com"` matches `sub.example.com`,
///     `a.b.example.com`, and `example.com` itself
///
/// URLs without a host (`about:blank`, `data:`) are blocked when a list is
/// configured.
pub fn is_host_allowed(allowed: &[String], url: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return false;
    };
    allowed.iter().any(|pattern| {
        let p = pattern.to_ascii_lowercase();
        match p.strip_prefix('*') {
            Some(suffix) => {
                host.ends_with(suffix)
                    || suffix.strip_prefix('.').is_some_and(|bare| host == bare)
            }
            None => host == p,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_origin() {
        assert_eq!(
            extract_origin("https://User@Example.com:443/path?q=1"),
            Some("https://example.com".to_string())
        );
        assert_eq!(
            extract_origin("http://localhost:8080/"),
            Some("http://localhost:8080".to_string())
        );
        assert_eq!(extract_origin("data:text/html,hi"), None);
        assert_eq!(extract_origin("nonsense"), None);
    }

    #[test]
    fn test_origin_trust() {
        let trusted = list(&["https://app.test"]);
        assert!(is_origin_trusted(&trusted, "https://app.test/index.html"));
        assert!(!is_origin_trusted(&trusted, "https://evil.test/"));
        assert!(!is_origin_trusted(&trusted, "garbage"));
        assert!(is_origin_trusted(&[], "garbage"));
    }

    #[test]
    fn test_allowed_hosts() {
        let allowed = list(&["*.example.com", "docs.rs"]);
        assert!(is_host_allowed(&allowed, "https://example.com/"));
        assert!(is_host_allowed(&allowed, "https://a.b.Example.com/x"));
        assert!(is_host_allowed(&allowed, "https://docs.rs/url"));
        assert!(!is_host_allowed(&allowed, "https://notexample.com/"));
        assert!(!is_host_allowed(&allowed, "https://sub.docs.rs/"));
        assert!(!is_host_allowed(&allowed, "about:blank"));
        assert!(is_host_allowed(&[], "about:blank"));
    }
}
