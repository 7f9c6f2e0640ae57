//! Stop-and-wait transfer state machine
//!
//! A [`TransferSession`] drives one get or put from the initial request to a
//! terminal state. Exactly one unit is in flight at any time: the request,
//! then either the last ACK (get) or the last DATA block (put). That unit is
//! what the [`Retransmitter`] resends on timeout.
//!
//! ```text
//! Init -> AwaitingFirstResponse -> Transferring -> Complete
//!   \____________________\_______________\______-> Aborted
//! ```

use std::io::{self, Read, Write};
use std::net::SocketAddr;

use super::error::{RemoteError, TransferError};
use crate::tftp::core::{
    BLOCK_SIZE, ErrorCode, Mode, Packet, RetryError, Retransmitter, Transport, Verdict,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    AwaitingFirstResponse,
    Transferring,
    Complete,
    Aborted,
}

/// Counters reported when a transfer finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Data blocks accepted (get) or acknowledged (put), including the terminal block
    pub blocks: u64,
    /// Payload bytes written or sent
    pub bytes: u64,
    /// Datagrams sent again because of a timeout or a duplicate
    pub retransmissions: u64,
}

/// What a get exchange hands back to the state machine
enum Inbound {
    Data { payload: Vec<u8>, from: SocketAddr },
    Remote(RemoteError),
}

/// One get or put against a single server
pub struct TransferSession<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
    retry: Retransmitter,
    filename: String,
    mode: Mode,
    server: SocketAddr,
    peer: Option<SocketAddr>,
    block: u16,
    direction: Option<Direction>,
    state: SessionState,
    stats: TransferStats,
}

impl<'t, T: Transport + ?Sized> TransferSession<'t, T> {
    /// Create a session that will talk to `server` (the well-known request port)
    pub fn new(
        transport: &'t mut T,
        server: SocketAddr,
        filename: impl Into<String>,
        retry: Retransmitter,
    ) -> Self {
        Self {
            transport,
            retry,
            filename: filename.into(),
            mode: Mode::Octet,
            server,
            peer: None,
            block: 1,
            direction: None,
            state: SessionState::Init,
            stats: TransferStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Transfer endpoint chosen by the server, once known
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn stats(&self) -> TransferStats {
        TransferStats {
            retransmissions: self.retry.retransmissions(),
            ..self.stats
        }
    }

    #[cfg(test)]
    pub(crate) fn with_next_block(mut self, block: u16) -> Self {
        self.block = block;
        self
    }

    /// Fetch the remote file into `sink` (RRQ)
    pub fn get<W: Write>(&mut self, sink: &mut W) -> Result<TransferStats, TransferError> {
        if self.state != SessionState::Init {
            return Err(TransferError::SessionReused);
        }
        self.direction = Some(Direction::Get);

        let result = self.receive(sink);
        let flushed = sink.flush();
        let result = result.and_then(|stats| {
            flushed
                .map(|()| stats)
                .map_err(|e| local_io(&self.filename, e))
        });
        self.finish(result)
    }

    /// Push the contents of `source` to the remote file (WRQ)
    pub fn put<R: Read>(&mut self, source: &mut R) -> Result<TransferStats, TransferError> {
        if self.state != SessionState::Init {
            return Err(TransferError::SessionReused);
        }
        self.direction = Some(Direction::Put);

        let result = self.send(source);
        self.finish(result)
    }

    fn finish(
        &mut self,
        result: Result<TransferStats, TransferError>,
    ) -> Result<TransferStats, TransferError> {
        match &result {
            Ok(stats) => {
                self.state = SessionState::Complete;
                log::debug!(
                    "Transfer of {} complete: {} blocks, {} bytes, {} retransmissions",
                    self.filename,
                    stats.blocks,
                    stats.bytes,
                    stats.retransmissions
                );
            }
            Err(e) => {
                self.state = SessionState::Aborted;
                log::debug!("Transfer of {} aborted: {}", self.filename, e);
            }
        }
        result
    }

    fn receive<W: Write>(&mut self, sink: &mut W) -> Result<TransferStats, TransferError> {
        let mut request = Packet::Rrq {
            filename: self.filename.clone(),
            mode: self.mode,
        }
        .serialize()?;
        let mut dest = self.server;
        let reject = unknown_transfer_id()?;
        self.state = SessionState::AwaitingFirstResponse;

        loop {
            let peer = self.peer;
            let expected = self.block;

            let inbound = self
                .retry
                .exchange_with(&mut *self.transport, &request, dest, |datagram, from| {
                    if peer.is_some_and(|p| p != from) {
                        return reject_stranger(datagram, from, &reject);
                    }
                    match Packet::deserialize(datagram) {
                        Ok(Packet::Data { block_num, data }) if block_num == expected => {
                            Verdict::Accept(Inbound::Data {
                                payload: data,
                                from,
                            })
                        }
                        Ok(Packet::Data { block_num, .. }) => {
                            log::warn!(
                                "Received unexpected block {}, expected {}",
                                block_num,
                                expected
                            );
                            // Only ever ack a block that was written. A stray
                            // number re-acks the last accepted block, and
                            // before the first block there is nothing to ack.
                            if peer.is_some() {
                                Verdict::Resend
                            } else {
                                Verdict::Ignore
                            }
                        }
                        Ok(Packet::Error { code, msg }) => Verdict::Accept(Inbound::Remote(
                            RemoteError {
                                code,
                                message: msg,
                            },
                        )),
                        Ok(other) => {
                            log::warn!("Ignoring unexpected packet from {}: {:?}", from, other);
                            Verdict::Ignore
                        }
                        Err(e) => {
                            log::debug!("Ignoring malformed datagram from {}: {}", from, e);
                            Verdict::Ignore
                        }
                    }
                })
                .map_err(|e| retry_failed(e, dest))?;

            let (payload, from) = match inbound {
                Inbound::Remote(err) => return Err(TransferError::Remote(err)),
                Inbound::Data { payload, from } => (payload, from),
            };

            sink.write_all(&payload)
                .map_err(|e| local_io(&self.filename, e))?;
            if self.peer.is_none() {
                log::debug!("Transfer of {} bound to {}", self.filename, from);
                self.peer = Some(from);
                self.state = SessionState::Transferring;
            }
            self.stats.blocks += 1;
            self.stats.bytes += payload.len() as u64;
            self.block = expected.wrapping_add(1);

            // The ACK goes out as the next exchange's request, so it is the
            // unit resent on timeout. The final ACK is sent once on its own.
            request = Packet::Ack(expected).serialize()?;
            dest = from;
            if payload.len() < BLOCK_SIZE {
                self.transport.send_to(&request, dest)?;
                return Ok(self.stats());
            }
        }
    }

    fn send<R: Read>(&mut self, source: &mut R) -> Result<TransferStats, TransferError> {
        let wrq = Packet::Wrq {
            filename: self.filename.clone(),
            mode: self.mode,
        }
        .serialize()?;
        let server = self.server;
        let reject = unknown_transfer_id()?;
        self.state = SessionState::AwaitingFirstResponse;

        let first = self
            .retry
            .exchange_with(&mut *self.transport, &wrq, server, |datagram, from| {
                match Packet::deserialize(datagram) {
                    Ok(Packet::Ack(0)) => Verdict::Accept(Ok(from)),
                    Ok(Packet::Error { code, msg }) => Verdict::Accept(Err(RemoteError {
                        code,
                        message: msg,
                    })),
                    Ok(other) => {
                        log::warn!("Ignoring unexpected packet from {}: {:?}", from, other);
                        Verdict::Ignore
                    }
                    Err(e) => {
                        log::debug!("Ignoring malformed datagram from {}: {}", from, e);
                        Verdict::Ignore
                    }
                }
            })
            .map_err(|e| retry_failed(e, server))?;
        let peer = first.map_err(TransferError::Remote)?;

        log::debug!("Transfer of {} bound to {}", self.filename, peer);
        self.peer = Some(peer);
        self.state = SessionState::Transferring;

        let mut chunk = Vec::with_capacity(BLOCK_SIZE);
        loop {
            chunk.clear();
            let read = source
                .by_ref()
                .take(BLOCK_SIZE as u64)
                .read_to_end(&mut chunk);
            if let Err(e) = read {
                self.notify_abort(peer)?;
                return Err(local_io(&self.filename, e));
            }

            let block = self.block;
            let len = chunk.len();
            // Serialized once: every retransmission of this block is byte-identical
            let data = Packet::Data {
                block_num: block,
                data: std::mem::take(&mut chunk),
            }
            .serialize()?;

            let reply = self
                .retry
                .exchange_with(&mut *self.transport, &data, peer, |datagram, from| {
                    if from != peer {
                        return reject_stranger(datagram, from, &reject);
                    }
                    match Packet::deserialize(datagram) {
                        Ok(Packet::Ack(n)) if n == block => Verdict::Accept(None),
                        Ok(Packet::Ack(n)) => {
                            log::debug!("Ignoring ACK {} while waiting for {}", n, block);
                            Verdict::Ignore
                        }
                        Ok(Packet::Error { code, msg }) => Verdict::Accept(Some(RemoteError {
                            code,
                            message: msg,
                        })),
                        Ok(other) => {
                            log::warn!("Ignoring unexpected packet from {}: {:?}", from, other);
                            Verdict::Ignore
                        }
                        Err(e) => {
                            log::debug!("Ignoring malformed datagram from {}: {}", from, e);
                            Verdict::Ignore
                        }
                    }
                })
                .map_err(|e| retry_failed(e, peer))?;
            if let Some(err) = reply {
                return Err(TransferError::Remote(err));
            }

            self.stats.blocks += 1;
            self.stats.bytes += len as u64;
            self.block = block.wrapping_add(1);
            if len < BLOCK_SIZE {
                return Ok(self.stats());
            }
        }
    }

    /// Tell the peer the transfer is over so it does not wait out its timeout
    fn notify_abort(&mut self, peer: SocketAddr) -> Result<(), TransferError> {
        let abort = Packet::error(ErrorCode::NotDefined).serialize()?;
        if let Err(e) = self.transport.send_to(&abort, peer) {
            log::warn!("Failed to notify {} of the aborted transfer: {}", peer, e);
        }
        Ok(())
    }
}

fn unknown_transfer_id() -> Result<Vec<u8>, TransferError> {
    Ok(Packet::error(ErrorCode::UnknownTransferId).serialize()?)
}

/// Datagram from an address other than the bound peer (RFC 1350 §4)
fn reject_stranger<V>(datagram: &[u8], from: SocketAddr, reject: &[u8]) -> Verdict<V> {
    log::warn!("Datagram from unknown transfer ID {}", from);
    match Packet::deserialize(datagram) {
        // Never answer an error with an error
        Ok(Packet::Error { .. }) => Verdict::Ignore,
        _ => Verdict::Answer(reject.to_vec(), from),
    }
}

fn retry_failed(err: RetryError, peer: SocketAddr) -> TransferError {
    match err {
        RetryError::TimeoutExceeded { attempts } => TransferError::NetworkTimeout { peer, attempts },
        RetryError::Io(e) => TransferError::Socket(e),
    }
}

fn local_io(file: &str, source: io::Error) -> TransferError {
    TransferError::LocalIo {
        file: file.to_string(),
        source,
    }
}
