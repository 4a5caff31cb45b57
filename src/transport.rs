//! TCP transport layer for ISO-on-TCP communication.
//!
//! This module provides the [`TcpTransport`] struct which handles low-level
//! TCP communication with the PLC. The transport layer is completely
//! separated from the protocol layer—it only knows about sockets and bytes.
//!
//! # Design
//!
//! - **Protocol agnostic** - handles only byte transmission, no S7 knowledge
//! - **Synchronous** - blocking send/receive with a receive deadline
//! - **Simple** - one socket, one remote address, strictly alternating
//!   send/receive use
//!
//! The receive path reads exact byte counts because ISO-on-TCP frames are
//! length-prefixed: the session layer first reads the 4-byte TPKT header,
//! then asks for precisely the remaining bytes of the frame.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::error::{Result, S7Error};

/// Default receive timeout.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// TCP transport for ISO-on-TCP framing.
///
/// Owns the stream exclusively; the session layer drives it with one
/// in-flight request at a time.
pub(crate) struct TcpTransport {
    stream: TcpStream,
    remote_addr: SocketAddr,
    recv_timeout: Duration,
}

impl TcpTransport {
    /// Resolves `host` and opens a TCP connection with `TCP_NODELAY` set.
    ///
    /// The receive timeout bounds every subsequent [`recv_exact`]
    /// (see [`TcpTransport::recv_exact`]).
    pub(crate) fn open(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        recv_timeout: Duration,
    ) -> Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(S7Error::TcpConnectionFailed)?
            .collect();
        let addr = addrs
            .first()
            .copied()
            .ok_or_else(|| {
                S7Error::TcpConnectionFailed(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "host resolved to no address",
                ))
            })?;
        let stream =
            TcpStream::connect_timeout(&addr, connect_timeout).map_err(S7Error::TcpConnectionFailed)?;
        stream.set_nodelay(true).map_err(S7Error::TcpConnectionFailed)?;
        stream
            .set_read_timeout(Some(recv_timeout))
            .map_err(S7Error::TcpConnectionFailed)?;
        stream
            .set_write_timeout(Some(recv_timeout))
            .map_err(S7Error::TcpConnectionFailed)?;

        Ok(Self {
            stream,
            remote_addr: addr,
            recv_timeout,
        })
    }

    /// Sends `data` completely and flushes the stream.
    pub(crate) fn send(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .and_then(|_| self.stream.flush())
            .map_err(|e| {
                warn!(error = %e, "send to {} failed", self.remote_addr);
                S7Error::TcpDataSend(e)
            })
    }

    /// Reads exactly `buf.len()` bytes into `buf`.
    ///
    /// A single deadline covers the whole read: if it expires before the
    /// requested bytes arrived, any residue sitting in the socket is drained
    /// so the next request starts on a frame boundary, and
    /// [`S7Error::TcpDataRecvTimeout`] is returned. A zero-byte read maps to
    /// [`S7Error::TcpConnectionReset`].
    pub(crate) fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let deadline = Instant::now() + self.recv_timeout;
        let mut filled = 0;
        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.drain();
                return Err(S7Error::TcpDataRecvTimeout);
            }
            // set_read_timeout rejects a zero Duration
            let _ = self
                .stream
                .set_read_timeout(Some(remaining.max(Duration::from_millis(1))));
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => return Err(S7Error::TcpConnectionReset),
                Ok(n) => {
                    trace!(bytes = n, "received");
                    filled += n;
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    self.drain();
                    return Err(S7Error::TcpDataRecvTimeout);
                }
                Err(e) => return Err(S7Error::TcpDataRecv(e)),
            }
        }
        Ok(())
    }

    /// Discards whatever is pending on the socket.
    ///
    /// Called after a receive timeout; a partial frame left behind would
    /// otherwise desynchronize every following exchange. Note that this can
    /// also discard a frame that arrives exactly on the deadline.
    fn drain(&mut self) {
        if self.stream.set_nonblocking(true).is_err() {
            return;
        }
        let mut sink = [0u8; 512];
        while matches!(self.stream.read(&mut sink), Ok(n) if n > 0) {}
        let _ = self.stream.set_nonblocking(false);
        let _ = self.stream.set_read_timeout(Some(self.recv_timeout));
    }

    /// Shuts the connection down. Idempotent; errors are ignored.
    pub(crate) fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    /// Returns the remote PLC address.
    #[allow(dead_code)]
    pub(crate) fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.stream.local_addr().ok())
            .field("recv_timeout", &self.recv_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_RECV_TIMEOUT, Duration::from_millis(2000));
        assert_eq!(DEFAULT_CONNECT_TIMEOUT, Duration::from_millis(5000));
    }

    #[test]
    fn test_open_and_send() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).unwrap();
            buf
        });

        let mut transport = TcpTransport::open(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap();
        transport.send(&[1, 2, 3, 4]).unwrap();
        assert_eq!(server.join().unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_recv_exact() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            // Two writes for one logical frame; recv_exact must reassemble.
            conn.write_all(&[0xAA, 0xBB]).unwrap();
            conn.write_all(&[0xCC]).unwrap();
            conn
        });

        let mut transport = TcpTransport::open(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap();
        let mut buf = [0u8; 3];
        transport.recv_exact(&mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB, 0xCC]);
        drop(server.join().unwrap());
    }

    #[test]
    fn test_recv_timeout() {
        let (listener, port) = listener();
        let server = thread::spawn(move || listener.accept().unwrap());

        let mut transport = TcpTransport::open(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(50),
        )
        .unwrap();
        let mut buf = [0u8; 4];
        match transport.recv_exact(&mut buf) {
            Err(S7Error::TcpDataRecvTimeout) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
        drop(server.join().unwrap());
    }

    #[test]
    fn test_recv_reset() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (conn, _) = listener.accept().unwrap();
            drop(conn);
        });

        let mut transport = TcpTransport::open(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap();
        server.join().unwrap();
        let mut buf = [0u8; 4];
        match transport.recv_exact(&mut buf) {
            Err(S7Error::TcpConnectionReset) => {}
            other => panic!("expected reset, got {other:?}"),
        }
    }

    #[test]
    fn test_connect_failure() {
        // Port 1 on localhost is almost certainly closed.
        let result = TcpTransport::open(
            "127.0.0.1",
            1,
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        match result {
            Err(S7Error::TcpConnectionFailed(_)) => {}
            other => panic!("expected connection failure, got {other:?}"),
        }
    }

    #[test]
    fn test_debug() {
        let (listener, port) = listener();
        let server = thread::spawn(move || listener.accept().unwrap());
        let transport = TcpTransport::open(
            "127.0.0.1",
            port,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .unwrap();
        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("TcpTransport"));
        assert!(debug_str.contains("127.0.0.1"));
        drop(server.join().unwrap());
    }
}
