//! Redirect policy (§4.5).
//!
//! A redirect is emitted when a redirect function, a non-zero redirect
//! port, or a redirect protocol is configured. GET requests honor all
//! three; POST only honors the redirect function, so a POST body is never
//! silently dropped by a static protocol/port redirect.

use std::sync::Arc;

use crate::header::ParsedHeader;

/// Host-supplied function computing a redirect target from the request.
///
/// Mirrors the source's `redirectFunction(client_socket, root, header, body,
/// cookies)` callback, minus the socket — this crate's redirect policy never
/// needs to write to the connection directly; it just returns a URL.
pub type RedirectFn = Arc<dyn Fn(&ParsedHeader, &[u8]) -> Option<String> + Send + Sync>;

/// Snapshot of a listener's redirect configuration, captured into a
/// [`crate::value`]-free `Copy`-ish struct at accept time so a connection
/// worker reads a single consistent view even if the listener's live config
/// changes mid-flight (§9 "redirect field tearing is intentional").
#[derive(Clone)]
pub struct RedirectConfig {
    pub protocol: Option<String>,
    pub port: u16,
    pub function: Option<RedirectFn>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self { protocol: None, port: 0, function: None }
    }
}

impl RedirectConfig {
    pub fn is_configured(&self) -> bool {
        self.function.is_some() || self.port != 0 || self.protocol.is_some()
    }
}

/// Method-aware check for whether a redirect applies to this request (§4.5).
pub fn applies_to(config: &RedirectConfig, is_get: bool) -> bool {
    if !config.is_configured() {
        return false;
    }
    if is_get {
        true
    } else {
        config.function.is_some()
    }
}

/// Resolves the redirect target URL for a request, or `None` if no redirect applies.
pub fn resolve_target(config: &RedirectConfig, header: &ParsedHeader, body: &[u8], is_get: bool) -> Option<String> {
    if !applies_to(config, is_get) {
        return None;
    }

    // `function` takes precedence over the protocol/port path and is
    // exclusive: if it's configured and declines, there is no fallback
    // (falling through here would self-redirect to the identical URL on any
    // request it declines, looping forever).
    if let Some(f) = &config.function {
        return f(header, body);
    }

    if !is_get {
        return None;
    }

    let host = header.get_str("Host")?;
    let host = if config.port != 0 { strip_port(host) } else { host };

    let scheme_prefix = config.protocol.as_deref().map(|p| format!("{p}://")).unwrap_or_default();
    let port_suffix = if config.port != 0 { format!(":{}", config.port) } else { String::new() };
    let path = header.location().split('?').next().unwrap_or("");

    Some(format!("{scheme_prefix}{host}{port_suffix}{path}"))
}

fn strip_port(host: &str) -> &str {
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}

/// Renders the `301 Moved Permanently` response bytes for a redirect target.
pub fn render_redirect_response(url: &str) -> Vec<u8> {
    format!("HTTP/1.1 301 Moved Permanently\r\nLocation: {url}\r\n\r\n").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_with_host(host: &str, location: &str) -> ParsedHeader {
        let mut h = ParsedHeader::default();
        h.insert("Host", host.as_bytes().to_vec());
        h.insert(crate::header::HTTP_LOCATION, location.as_bytes().to_vec());
        h
    }

    #[test]
    fn static_protocol_and_port_redirect_on_get() {
        let config = RedirectConfig { protocol: Some("https".into()), port: 9002, function: None };
        let header = header_with_host("127.0.0.1:9001", "/");
        let url = resolve_target(&config, &header, b"", true).unwrap();
        assert_eq!(url, "https://127.0.0.1:9002/");
    }

    #[test]
    fn post_ignores_static_protocol_and_port() {
        let config = RedirectConfig { protocol: Some("https".into()), port: 9002, function: None };
        let header = header_with_host("127.0.0.1:9001", "/");
        assert!(resolve_target(&config, &header, b"", false).is_none());
    }

    #[test]
    fn post_honors_redirect_function() {
        let config = RedirectConfig {
            protocol: None,
            port: 0,
            function: Some(Arc::new(|_h: &ParsedHeader, _b: &[u8]| Some("https://elsewhere/".to_owned()))),
        };
        let header = header_with_host("x", "/");
        assert_eq!(resolve_target(&config, &header, b"", false), Some("https://elsewhere/".to_owned()));
    }

    #[test]
    fn unconfigured_redirect_is_none() {
        let config = RedirectConfig::default();
        let header = header_with_host("x", "/");
        assert!(resolve_target(&config, &header, b"", true).is_none());
    }

    #[test]
    fn declining_function_does_not_fall_back_even_with_protocol_and_port_set() {
        let config = RedirectConfig {
            protocol: Some("https".into()),
            port: 9002,
            function: Some(Arc::new(|_h: &ParsedHeader, _b: &[u8]| None)),
        };
        let header = header_with_host("127.0.0.1:9001", "/");
        assert!(resolve_target(&config, &header, b"", true).is_none());
    }

    #[test]
    fn declining_function_only_configured_is_none() {
        let config = RedirectConfig {
            protocol: None,
            port: 0,
            function: Some(Arc::new(|_h: &ParsedHeader, _b: &[u8]| None)),
        };
        let header = header_with_host("x", "/");
        assert!(resolve_target(&config, &header, b"", true).is_none());
    }
}
