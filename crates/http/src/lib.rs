//! Blocking HTTP/1.1 protocol and transport plumbing.
//!
//! This crate provides the pieces an embeddable, thread-per-connection HTTP
//! server needs below the dispatch layer: a header/cookie parser tolerant of
//! both request line endings, a MIME resolver, a static-file responder with
//! traversal protection and WSDL/XSD namespace substitution, a redirect
//! policy, a response framer, the `Value`/`CodecHooks` contract used to pass
//! application data through pluggable XML/JSON codecs, and a blocking
//! transport abstraction over plain TCP and TLS.
//!
//! The only background work this crate starts on its own is the date-string
//! refresh thread and the per-handshake TLS watchdog; the accept loop and
//! per-connection worker lifecycle live in `rws-service`.

pub mod codec;
pub mod cookie;
pub mod date;
pub mod error;
pub mod header;
pub mod mime_resolver;
pub mod redirect;
pub mod response;
pub mod static_file;
pub mod tls;
pub mod transport;
pub mod value;

pub use codec::{CodecHooks, NullCodec};
pub use header::ParsedHeader;
pub use value::{RequestObject, ResponseObject, Value};

pub(crate) use help::ensure;

mod help {
    macro_rules! ensure {
        ($predicate:expr, $error:expr) => {
            if !$predicate {
                return Err($error);
            }
        };
    }
    pub(crate) use ensure;
}
