//! Cookie header parsing (§4.4).
//!
//! Splits the `Cookie` header on `"; "` into `name=value` pairs, then strips
//! an optional `{scheme}://{host}.` prefix from each cookie name — this lets
//! one listener serve several subdomains while handlers see a single
//! logical cookie name.

use std::collections::BTreeMap;

/// A parsed `Cookie` header: cookie name → value.
pub type CookieMap = BTreeMap<String, String>;

/// Parses a `Cookie` header value, stripping `http://{host}.` / `https://{host}.`
/// prefixes from cookie names so that multi-subdomain deployments see
/// logically identical names.
pub fn parse_cookies(cookie_header: &str, host: &str) -> CookieMap {
    let prefixes = [format!("http://{host}."), format!("https://{host}.")];

    let mut map = CookieMap::new();
    for pair in cookie_header.split("; ") {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((name, value)) = pair.split_once('=') else { continue };
        let mut name = name.to_owned();
        for prefix in &prefixes {
            if let Some(stripped) = name.strip_prefix(prefix.as_str()) {
                name = stripped.to_owned();
                break;
            }
        }
        map.insert(name, value.to_owned());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pairs() {
        let map = parse_cookies("a=1; b=2", "example.com");
        assert_eq!(map.get("a"), Some(&"1".to_owned()));
        assert_eq!(map.get("b"), Some(&"2".to_owned()));
    }

    #[test]
    fn strips_scheme_host_prefix() {
        let map = parse_cookies("https://sub.example.com.session=abc", "sub.example.com");
        assert_eq!(map.get("session"), Some(&"abc".to_owned()));
    }

    #[test]
    fn leaves_non_matching_prefix_alone() {
        let map = parse_cookies("http://other.com.session=abc", "sub.example.com");
        assert_eq!(map.get("http://other.com.session"), Some(&"abc".to_owned()));
    }

    #[test]
    fn empty_header_yields_empty_map() {
        assert!(parse_cookies("", "x").is_empty());
    }
}
