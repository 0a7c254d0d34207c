//! Error types for HTTP protocol handling.
//!
//! Each stage of the pipeline (parsing, sending) has its own `thiserror`
//! enum so call sites can match on the specific failure without downcasting.

use std::io;
use thiserror::Error;

/// Errors that occur while parsing an HTTP request header.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The request line did not contain a recognizable command/target/protocol triple.
    #[error("malformed request line")]
    MalformedRequestLine,

    /// No header terminator (`\r\n\r\n` or `\n\n`) was found within budget.
    #[error("incomplete header")]
    IncompleteHeader,

    /// The header section was empty (just the terminator).
    #[error("empty header")]
    EmptyHeader,

    /// `Content-Length` was present but not a valid non-negative integer.
    #[error("invalid content-length: {reason}")]
    InvalidContentLength { reason: String },

    /// I/O error while reading from the transport.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }
}

/// Errors that occur while writing an HTTP response.
#[derive(Debug, Error)]
pub enum SendError {
    /// The response object was missing a required entry (e.g. `body` in raw mode).
    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    /// A short write occurred; the caller must treat the connection as dead.
    #[error("short write: wrote {wrote} of {total} bytes")]
    ShortWrite { wrote: usize, total: usize },

    /// I/O error while writing to the transport.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_response<S: ToString>(reason: S) -> Self {
        Self::InvalidResponse { reason: reason.to_string() }
    }
}
