//! Datagram transport abstraction
//!
//! The session never touches a socket directly. It is handed something that
//! can send a datagram to an address and wait a bounded time for the next one.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Send/receive capability owned by the caller of a transfer
pub trait Transport {
    /// Send one datagram to `dest`
    fn send_to(&mut self, buf: &[u8], dest: SocketAddr) -> io::Result<()>;

    /// Wait up to `timeout` for the next datagram.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>>;
}

/// [`Transport`] over a blocking UDP socket
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    read_timeout: Option<Duration>,
}

impl UdpTransport {
    /// Bind an ephemeral local port in the same address family as `peer`
    pub fn bind_for(peer: SocketAddr) -> io::Result<Self> {
        let local = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        Ok(Self::new(UdpSocket::bind(local)?))
    }

    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            read_timeout: None,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn send_to(&mut self, buf: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.socket.send_to(buf, dest)?;
        Ok(())
    }

    fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        // A zero read timeout is rejected by the OS
        if timeout.is_zero() {
            return Ok(None);
        }
        if self.read_timeout != Some(timeout) {
            self.socket.set_read_timeout(Some(timeout))?;
            self.read_timeout = Some(timeout);
        }

        match self.socket.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
