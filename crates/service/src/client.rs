//! Companion blocking HTTP/1.1 client (§4.11).
//!
//! Exists purely to drive this workspace's own integration tests end to
//! end. It connects, writes a request line, headers, and body, then reads
//! back a status line, headers, and a `Content-Length`-bounded body. It does
//! not follow redirects or reuse connections, matching the server's own
//! "serve once then close" behavior.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use thiserror::Error;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// A minimal blocking HTTP/1.1 client for test scenarios.
pub struct Client {
    addr: String,
}

/// The parsed response to a [`Client`] request.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ClientResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl Client {
    pub fn connect(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Sends a raw request line plus headers and body, then reads the
    /// response. `headers` is sent in iteration order after the request
    /// line; `Host` and `Content-Length` are added automatically.
    pub fn request(&self, method: &str, path: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<ClientResponse, ClientError> {
        let mut stream = TcpStream::connect(&self.addr)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut request = format!("{method} {path} HTTP/1.1\r\nHost: {}\r\n", self.addr);
        for (name, value) in headers {
            request.push_str(&format!("{name}: {value}\r\n"));
        }
        if !body.is_empty() {
            request.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        request.push_str("\r\n");

        stream.write_all(request.as_bytes())?;
        stream.write_all(body)?;

        read_response(&mut stream)
    }

    pub fn get(&self, path: &str, headers: &[(&str, &str)]) -> Result<ClientResponse, ClientError> {
        self.request("GET", path, headers, b"")
    }

    pub fn post(&self, path: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<ClientResponse, ClientError> {
        self.request("POST", path, headers, body)
    }
}

fn read_response(stream: &mut TcpStream) -> Result<ClientResponse, ClientError> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find_terminator(&buf) {
            break pos;
        }
        match stream.read(&mut chunk) {
            Ok(0) => return Err(ClientError::MalformedResponse("connection closed before headers completed".to_owned())),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(err) => return Err(ClientError::Io(err)),
        }
    };

    let header_text = std::str::from_utf8(&buf[..header_end]).map_err(|_| ClientError::MalformedResponse("headers are not valid utf-8".to_owned()))?;
    let mut lines = header_text.split("\r\n");
    let status_line = lines.next().ok_or_else(|| ClientError::MalformedResponse("empty response".to_owned()))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ClientError::MalformedResponse(format!("bad status line: {status_line}")))?;

    let mut headers = BTreeMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(": ") {
            headers.insert(name.to_ascii_lowercase(), value.to_owned());
        }
    }

    let content_length: usize = headers.get("content-length").and_then(|v| v.parse().ok()).unwrap_or(0);
    let terminator_end = header_end;
    while buf.len() < terminator_end + content_length {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(err) => return Err(ClientError::Io(err)),
        }
    }

    let body = buf[terminator_end..(terminator_end + content_length).min(buf.len())].to_vec();
    Ok(ClientResponse { status, headers, body })
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}
