//! Transport abstraction over a plain TCP socket or a TLS stream (§2, component A).
//!
//! A connection worker reads and writes through a [`Transport`] without
//! caring whether TLS is involved; the listener decides that once, at
//! accept time, and hands the worker a concrete variant.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::tls::TlsStream;

/// A live connection, either plaintext or TLS-wrapped.
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl Transport {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Transport::Plain(s) => s.peer_addr(),
            Transport::Tls(s) => s.sock.peer_addr(),
        }
    }

    /// Sets the socket-level read timeout (§9's three-second read budget).
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.set_read_timeout(timeout),
            Transport::Tls(s) => s.sock.set_read_timeout(timeout),
        }
    }

    /// Shuts down both halves of the underlying socket, unblocking any
    /// in-progress read on another thread (used by graceful shutdown).
    pub fn shutdown(&self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.shutdown(std::net::Shutdown::Both),
            Transport::Tls(s) => s.sock.shutdown(std::net::Shutdown::Both),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.read(buf),
            Transport::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(s) => s.write(buf),
            Transport::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(s) => s.flush(),
            Transport::Tls(s) => s.flush(),
        }
    }
}

/// Writes the full contents of `buf` to `transport`, returning
/// [`crate::error::SendError::ShortWrite`] if the underlying write returns
/// fewer bytes than requested without erroring outright (blocking sockets
/// shouldn't do this, but the source checks for it defensively and this
/// keeps that guarantee).
pub fn write_all_checked(transport: &mut Transport, buf: &[u8]) -> Result<(), crate::error::SendError> {
    let mut written = 0;
    while written < buf.len() {
        let n = transport.write(&buf[written..])?;
        if n == 0 {
            return Err(crate::error::SendError::ShortWrite { wrote: written, total: buf.len() });
        }
        written += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn plain_transport_round_trips_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();

        let mut server_transport = Transport::Plain(server);
        write_all_checked(&mut server_transport, b"hello").unwrap();

        let mut client = client;
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }
}
