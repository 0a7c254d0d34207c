//! HTTP request-line and header parsing.
//!
//! Unlike a conforming HTTP/1.1 parser, this one has to accept both `\r\n`
//! and bare `\n` line endings (§4.3), stash the request line under three
//! synthetic keys instead of structured `Method`/`Uri`/`Version` fields, and
//! join a value across lines when it looks like a wrapped quoted string
//! (the `SOAPAction: "ns/op"` wrapping case). `httparse`-style zero-copy
//! parsing doesn't fit those requirements, so this is a small hand-rolled
//! line splitter instead, matching the source parser's behavior line for
//! line rather than its implementation.

use std::collections::BTreeMap;

use crate::error::ParseError;

/// Synthetic key holding the HTTP method (`GET`, `POST`, ...).
pub const HTTP_COMMAND: &str = "_httpCommand";
/// Synthetic key holding the raw (percent-encoded) request target.
pub const HTTP_LOCATION: &str = "_httpLocation";
/// Synthetic key holding the protocol token (`HTTP/1.1`).
pub const HTTP_PROTOCOL: &str = "_httpProtocol";

/// A case-insensitive mapping from header field name to byte-string value,
/// plus the three synthetic request-line fields.
///
/// Field names are normalized to lowercase on insertion so lookups are
/// case-insensitive without re-hashing on every `get`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedHeader {
    fields: BTreeMap<String, Vec<u8>>,
}

impl ParsedHeader {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields.get(&name.to_ascii_lowercase()).map(Vec::as_slice)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: Vec<u8>) {
        self.fields.insert(name.as_ref().to_ascii_lowercase(), value);
    }

    pub fn command(&self) -> &str {
        self.get_str(HTTP_COMMAND).unwrap_or("")
    }

    pub fn location(&self) -> &str {
        self.get_str(HTTP_LOCATION).unwrap_or("")
    }

    pub fn protocol(&self) -> &str {
        self.get_str(HTTP_PROTOCOL).unwrap_or("")
    }

    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        match self.get_str("Content-Length") {
            None => Ok(None),
            Some(raw) => {
                let n = raw.trim().parse::<usize>().map_err(|_| ParseError::invalid_content_length(raw))?;
                Ok(Some(n))
            }
        }
    }
}

/// The position and length of the header terminator found in a buffer.
struct Terminator {
    start: usize,
    len: usize,
}

/// Locates `\r\n\r\n` or `\n\n`, whichever comes first, in `buf`.
pub fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    find_terminator(buf).map(|t| t.start + t.len)
}

fn find_terminator(buf: &[u8]) -> Option<Terminator> {
    let crlf = find_subslice(buf, b"\r\n\r\n").map(|start| Terminator { start, len: 4 });
    let lf = find_subslice(buf, b"\n\n").map(|start| Terminator { start, len: 2 });
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.start <= b.start { a } else { b }),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parses the header section of `buf` (everything up to and including the
/// terminator). Returns `None` for a malformed or empty header (§4.3).
pub fn parse_header(buf: &[u8]) -> Option<ParsedHeader> {
    let terminator = find_terminator(buf)?;
    let header_section = &buf[..terminator.start];
    if header_section.is_empty() {
        return None;
    }

    let line_sep: &[u8] = if buf[terminator.start..].starts_with(b"\r\n") { b"\r\n" } else { b"\n" };
    let lines = split_lines(header_section, line_sep);

    let mut lines = lines.into_iter();
    let request_line = lines.next()?;
    let mut header = ParsedHeader::default();
    parse_request_line(request_line, &mut header);

    let mut pending: Option<(String, Vec<u8>)> = None;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((name, mut value)) = pending.take() {
            if !looks_like_closed_quote(&value) {
                value.extend_from_slice(b" ");
                value.extend_from_slice(line);
                if looks_like_closed_quote(&value) || !starts_with_quote(&value) {
                    header.insert(&name, value);
                } else {
                    pending = Some((name, value));
                }
                continue;
            }
            header.insert(&name, value);
        }

        let Some(sep) = find_subslice(line, b": ") else { continue };
        let name = &line[..sep];
        if name.is_empty() {
            continue;
        }
        let value = line[sep + 2..].to_vec();
        let name = String::from_utf8_lossy(name).into_owned();

        if starts_with_quote(&value) && !looks_like_closed_quote(&value) {
            pending = Some((name, value));
        } else {
            header.insert(&name, value);
        }
    }
    if let Some((name, value)) = pending {
        header.insert(&name, value);
    }

    Some(header)
}

fn starts_with_quote(value: &[u8]) -> bool {
    value.first() == Some(&b'"')
}

fn looks_like_closed_quote(value: &[u8]) -> bool {
    value.len() >= 2 && value.first() == Some(&b'"') && value.last() == Some(&b'"')
}

fn split_lines<'a>(buf: &'a [u8], sep: &[u8]) -> Vec<&'a [u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start <= buf.len() {
        match find_subslice(&buf[start..], sep) {
            Some(rel) => {
                lines.push(&buf[start..start + rel]);
                start += rel + sep.len();
            }
            None => {
                lines.push(&buf[start..]);
                break;
            }
        }
    }
    lines
}

/// Splits the request line into up to three whitespace-delimited fields and
/// stores them under the synthetic keys, leaving unset fields empty (§4.3).
fn parse_request_line(line: &[u8], header: &mut ParsedHeader) {
    let mut parts = line.split(|b| *b == b' ').filter(|p| !p.is_empty());
    header.insert(HTTP_COMMAND, parts.next().unwrap_or(&[]).to_vec());
    header.insert(HTTP_LOCATION, parts.next().unwrap_or(&[]).to_vec());
    header.insert(HTTP_PROTOCOL, parts.next().unwrap_or(&[]).to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parses_crlf_request() {
        let raw = "GET /index.html HTTP/1.1\r\nHost: 127.0.0.1:8999\r\nCookie: a=1\r\n\r\n";
        let header = parse_header(raw.as_bytes()).unwrap();
        assert_eq!(header.command(), "GET");
        assert_eq!(header.location(), "/index.html");
        assert_eq!(header.protocol(), "HTTP/1.1");
        assert_eq!(header.get_str("host"), Some("127.0.0.1:8999"));
        assert_eq!(header.get_str("Cookie"), Some("a=1"));
    }

    #[test]
    fn parses_lf_only_request() {
        let raw = "POST /webService/echo HTTP/1.1\nHost: x\nContent-Length: 5\n\n";
        let header = parse_header(raw.as_bytes()).unwrap();
        assert_eq!(header.command(), "POST");
        assert_eq!(header.content_length().unwrap(), Some(5));
    }

    #[test]
    fn empty_header_is_malformed() {
        assert!(parse_header(b"\r\n\r\n").is_none());
    }

    #[test]
    fn duplicate_header_last_write_wins() {
        let raw = indoc! {"
            GET / HTTP/1.1\r
            X-Thing: first\r
            X-Thing: second\r
            \r
        "};
        let header = parse_header(raw.as_bytes()).unwrap();
        assert_eq!(header.get_str("X-Thing"), Some("second"));
    }

    #[test]
    fn joins_wrapped_quoted_soap_action() {
        let raw = "POST / HTTP/1.1\r\nSOAPAction: \"x.com/ns\r\n/op\"\r\n\r\n";
        let header = parse_header(raw.as_bytes()).unwrap();
        assert_eq!(header.get_str("SOAPAction"), Some("\"x.com/ns /op\""));
    }

    #[test]
    fn no_terminator_returns_none() {
        assert!(parse_header(b"GET / HTTP/1.1\r\nHost: x").is_none());
    }

    #[test]
    fn anonymous_field_is_skipped() {
        let raw = "GET / HTTP/1.1\r\n: bogus\r\nHost: x\r\n\r\n";
        let header = parse_header(raw.as_bytes()).unwrap();
        assert_eq!(header.get_str("Host"), Some("x"));
    }
}
