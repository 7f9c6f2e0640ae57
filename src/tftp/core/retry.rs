//! Fixed-interval retransmission for a single request/response exchange

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::socket::Transport;

/// Receive buffer size; anything larger than a DATA packet is rejected by the codec anyway
const MAX_DATAGRAM: usize = 65_535;

/// What to do with a datagram received during an exchange
#[derive(Debug)]
pub enum Verdict<T> {
    /// The exchange is over
    Accept(T),
    /// Drop it and keep waiting on the current deadline
    Ignore,
    /// Send the request again right away, without spending an attempt
    Resend,
    /// Reply to someone else and keep waiting
    Answer(Vec<u8>, SocketAddr),
}

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("no usable response after {attempts} attempts")]
    TimeoutExceeded { attempts: u32 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Bounded stop-and-wait retransmission policy
#[derive(Debug)]
pub struct Retransmitter {
    max_attempts: u32,
    timeout: Duration,
    retransmissions: u64,
    buf: Vec<u8>,
}

impl Retransmitter {
    /// `max_attempts` counts total sends per exchange; zero is treated as one.
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            timeout,
            retransmissions: 0,
            buf: vec![0u8; MAX_DATAGRAM],
        }
    }

    /// Total resends performed across all exchanges so far
    pub fn retransmissions(&self) -> u64 {
        self.retransmissions
    }

    /// Send `request` to `dest` and return the first datagram that comes back
    pub fn exchange<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        request: &[u8],
        dest: SocketAddr,
    ) -> Result<(Vec<u8>, SocketAddr), RetryError> {
        self.exchange_with(transport, request, dest, |datagram, from| {
            Verdict::Accept((datagram.to_vec(), from))
        })
    }

    /// Send `request` to `dest` and wait until `screen` accepts a datagram.
    ///
    /// Each attempt waits at most the configured timeout. Datagrams the
    /// screen ignores do not extend that wait. When an attempt expires the
    /// identical request bytes are sent again.
    pub fn exchange_with<T, V, F>(
        &mut self,
        transport: &mut T,
        request: &[u8],
        dest: SocketAddr,
        mut screen: F,
    ) -> Result<V, RetryError>
    where
        T: Transport + ?Sized,
        F: FnMut(&[u8], SocketAddr) -> Verdict<V>,
    {
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                log::debug!(
                    "Timeout waiting for {}, retransmitting (attempt {}/{})",
                    dest,
                    attempt,
                    self.max_attempts
                );
                self.retransmissions += 1;
            }
            transport.send_to(request, dest)?;

            let deadline = Instant::now() + self.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                let Some((len, from)) = transport.recv_from(&mut self.buf, remaining)? else {
                    break;
                };

                match screen(&self.buf[..len], from) {
                    Verdict::Accept(value) => return Ok(value),
                    Verdict::Ignore => {}
                    Verdict::Resend => {
                        self.retransmissions += 1;
                        transport.send_to(request, dest)?;
                    }
                    Verdict::Answer(reply, to) => transport.send_to(&reply, to)?,
                }
            }
        }

        Err(RetryError::TimeoutExceeded {
            attempts: self.max_attempts,
        })
    }
}
