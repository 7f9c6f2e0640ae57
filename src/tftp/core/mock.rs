//! Scripted in-memory transport for exercising the protocol without sockets.
//!
//! Every datagram the code under test sends is recorded and handed to a
//! [`Peer`], whose replies are queued for later receives. An empty queue
//! behaves like a timeout, so a peer that stays silent simulates loss.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use super::packet::Packet;
use super::socket::Transport;

/// Replies queued by a peer: raw datagram plus the address it comes from
pub(crate) type Replies = Vec<(Vec<u8>, SocketAddr)>;

pub(crate) trait Peer {
    fn on_datagram(&mut self, datagram: &[u8], dest: SocketAddr) -> Replies;
}

impl<F> Peer for F
where
    F: FnMut(&[u8], SocketAddr) -> Replies,
{
    fn on_datagram(&mut self, datagram: &[u8], dest: SocketAddr) -> Replies {
        self(datagram, dest)
    }
}

pub(crate) struct MockTransport<P> {
    pub(crate) peer: P,
    pub(crate) sent: Vec<(Vec<u8>, SocketAddr)>,
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
}

impl<P: Peer> MockTransport<P> {
    pub(crate) fn new(peer: P) -> Self {
        Self {
            peer,
            sent: Vec::new(),
            inbox: VecDeque::new(),
        }
    }

    /// Everything sent so far, decoded
    pub(crate) fn sent_packets(&self) -> Vec<Packet> {
        self.sent
            .iter()
            .map(|(bytes, _)| Packet::deserialize(bytes).expect("code under test sent garbage"))
            .collect()
    }
}

impl<P: Peer> Transport for MockTransport<P> {
    fn send_to(&mut self, buf: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.sent.push((buf.to_vec(), dest));
        let replies = self.peer.on_datagram(buf, dest);
        self.inbox.extend(replies);
        Ok(())
    }

    fn recv_from(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        Ok(self.inbox.pop_front().map(|(datagram, from)| {
            buf[..datagram.len()].copy_from_slice(&datagram);
            (datagram.len(), from)
        }))
    }
}

pub(crate) fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

pub(crate) fn bytes(packet: Packet) -> Vec<u8> {
    packet.serialize().expect("test packet must encode")
}
