//! Blocking TLS transport (§5).
//!
//! The source's TLS support wraps a raw socket with OpenSSL's `SSL_accept`
//! and enforces a hard handshake deadline with a watchdog thread that closes
//! the underlying file descriptor out from under a wedged handshake. `rustls`
//! has no async-free cancellation primitive either, so the same watchdog
//! shape is kept here: a detached thread that waits out the deadline and
//! calls `shutdown` on a cloned socket handle if the handshake hasn't
//! finished by then.

use std::fs;
use std::io;
use std::net::TcpStream;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use thiserror::Error;

/// The default ceiling on how long a TLS handshake may take before the
/// watchdog tears the connection down (§5).
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read certificate or key material: {0}")]
    Io(#[from] io::Error),

    #[error("no certificates found in {path}")]
    NoCertificates { path: String },

    #[error("no private key found in {path}")]
    NoPrivateKey { path: String },

    #[error("invalid server configuration: {0}")]
    Config(#[from] rustls::Error),

    #[error("handshake exceeded its deadline")]
    HandshakeTimedOut,
}

/// Loads a PEM certificate chain and private key into a [`rustls::ServerConfig`].
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> Result<ServerConfig, TlsError> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let config = ServerConfig::builder().with_no_client_auth().with_single_cert(certs, key)?;
    Ok(config)
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let bytes = fs::read(path)?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut bytes.as_slice()).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates { path: path.display().to_string() });
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let bytes = fs::read(path)?;
    rustls_pemfile::private_key(&mut bytes.as_slice())?.ok_or_else(|| TlsError::NoPrivateKey { path: path.display().to_string() })
}

/// A blocking TLS stream wrapping an accepted connection, once the handshake
/// has completed.
pub type TlsStream = StreamOwned<ServerConnection, TcpStream>;

/// Performs a blocking TLS server handshake on `socket`, guarded by a
/// watchdog thread that force-closes the socket if the handshake runs past
/// `timeout`.
///
/// The watchdog clones the socket handle before handing ownership of the
/// original into the handshake; if the deadline fires first, it calls
/// `shutdown(Both)` on its clone, which unblocks the handshake's pending
/// read/write with an I/O error rather than hanging the worker thread forever.
pub fn accept(config: Arc<ServerConfig>, socket: TcpStream, timeout: Duration) -> Result<TlsStream, TlsError> {
    let watchdog_socket = socket.try_clone()?;
    let done = Arc::new(AtomicBool::new(false));
    let done_clone = Arc::clone(&done);

    let watchdog = std::thread::spawn(move || {
        std::thread::sleep(timeout);
        if !done_clone.load(Ordering::Acquire) {
            let _ = watchdog_socket.shutdown(std::net::Shutdown::Both);
        }
    });

    let conn = ServerConnection::new(config)?;
    let mut stream = StreamOwned::new(conn, socket);
    let handshake_result = stream.conn.complete_io(&mut stream.sock);

    done.store(true, Ordering::Release);
    let _ = watchdog.join();

    match handshake_result {
        Ok(_) => Ok(stream),
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(stream),
        Err(err) => {
            if stream.conn.is_handshaking() {
                tracing::warn!(timeout_secs = timeout.as_secs(), "TLS handshake exceeded its deadline");
                Err(TlsError::HandshakeTimedOut)
            } else {
                tracing::warn!(cause = %err, "TLS handshake failed");
                Err(TlsError::Io(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cert_file_is_an_io_error() {
        let err = load_certs(Path::new("/nonexistent/cert.pem")).unwrap_err();
        assert!(matches!(err, TlsError::Io(_)));
    }
}
