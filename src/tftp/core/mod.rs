//! TFTP core protocol implementation
//!
//! This module contains the building blocks shared by every transfer:
//! - `packet`: Packet serialization and deserialization
//! - `socket`: Datagram transport abstraction
//! - `retry`: Timeout-driven retransmission of a single exchange

#[cfg(test)]
pub(crate) mod mock;
mod packet;
pub mod retry;
mod socket;

// Public core types
pub use packet::{BLOCK_SIZE, DecodeError, EncodeError, ErrorCode, MAX_PACKET_SIZE, Mode, Packet};
pub use retry::{RetryError, Retransmitter, Verdict};
pub use socket::{Transport, UdpTransport};
