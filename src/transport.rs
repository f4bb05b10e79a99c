//! Uniform transport contract consumed by the connection state machine.
//!
//! The engine needs exactly three things from whatever carries bytes to and
//! from the peer: non-blocking `read`/`write` (std's own `WouldBlock`/`Ok(0)`
//! vocabulary is reused rather than inventing a parallel one), a way to drive
//! a TLS handshake to completion before data flows, and a way to observe a
//! deferred connect error (`SO_ERROR`). Plaintext sockets get the TLS step
//! for free via the trait's default implementation.

use crate::error::WsError;
use std::io;

#[derive(Debug, Eq, PartialEq)]
pub enum HandshakeStatus {
    Complete,
    Pending,
}

pub trait Transport: io::Read + io::Write {
    /// Drive one step of the transport-level handshake (TLS only; plaintext
    /// transports are always already complete). Called from the
    /// `TlsHandshake` connection state on every writable/readable event.
    fn tls_handshake(&mut self) -> Result<HandshakeStatus, WsError> {
        Ok(HandshakeStatus::Complete)
    }

    /// Consume and return the socket's pending error (`SO_ERROR`), checked
    /// once the `connect()` call's writable notification fires.
    fn take_error(&self) -> io::Result<Option<io::Error>>;
}

#[cfg(feature = "mio-reactor")]
mod mio_socket {
    use super::*;
    use mio::net::TcpStream;

    impl Transport for TcpStream {
        fn take_error(&self) -> io::Result<Option<io::Error>> {
            TcpStream::take_error(self)
        }
    }
}

#[cfg(feature = "rustls-tls")]
pub mod rustls_session {
    use super::*;
    use rustls::ClientConnection;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::Arc;

    /// A TLS session layered over an already-connected, non-blocking plain
    /// socket. Owns the socket so the pair can be driven as a single
    /// `Transport`.
    pub struct RustlsTransport {
        conn: ClientConnection,
        sock: TcpStream,
    }

    impl RustlsTransport {
        pub fn new(conn: ClientConnection, sock: TcpStream) -> RustlsTransport {
            RustlsTransport { conn, sock }
        }
    }

    /// The default trust store used when the embedder doesn't supply its own
    /// `rustls::ClientConfig` through `ClientBuilder::tls_config`: the
    /// Mozilla root set bundled by `webpki-roots`, with no client auth.
    pub fn default_config() -> Arc<rustls::ClientConfig> {
        let mut roots = rustls::RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(ta.subject, ta.spki, ta.name_constraints)
        }));

        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Arc::new(config)
    }

    /// Build a `rustls::ClientConfig` trusting only the CA certificates read
    /// from `pem`, for embedders pointed at a private or self-signed
    /// endpoint rather than the public web PKI.
    pub fn config_from_pem_roots<R: io::BufRead>(pem: &mut R) -> io::Result<Arc<rustls::ClientConfig>> {
        let mut roots = rustls::RootCertStore::empty();
        for der in rustls_pemfile::certs(pem)? {
            roots
                .add(&rustls::Certificate(der))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        }

        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Arc::new(config))
    }

    impl Transport for RustlsTransport {
        fn tls_handshake(&mut self) -> Result<HandshakeStatus, WsError> {
            if !self.conn.is_handshaking() {
                return Ok(HandshakeStatus::Complete);
            }

            if self.conn.wants_write() {
                match self.conn.write_tls(&mut self.sock) {
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(HandshakeStatus::Pending),
                    Err(e) => return Err(WsError::SslHandshake(e.to_string())),
                }
            }

            if self.conn.wants_read() {
                match self.conn.read_tls(&mut self.sock) {
                    Ok(0) => return Err(WsError::SslHandshake("eof during handshake".into())),
                    Ok(_) => {
                        self.conn
                            .process_new_packets()
                            .map_err(|e| WsError::SslHandshake(e.to_string()))?;
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(HandshakeStatus::Pending),
                    Err(e) => return Err(WsError::SslHandshake(e.to_string())),
                }
            }

            if self.conn.is_handshaking() {
                Ok(HandshakeStatus::Pending)
            } else {
                Ok(HandshakeStatus::Complete)
            }
        }

        fn take_error(&self) -> io::Result<Option<io::Error>> {
            self.sock.take_error()
        }
    }

    impl Read for RustlsTransport {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
            stream.read(buf)
        }
    }

    impl Write for RustlsTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
            stream.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            let mut stream = rustls::Stream::new(&mut self.conn, &mut self.sock);
            stream.flush()
        }
    }

}


#[cfg(test)]
pub use tests::MockPipe;
