//! TFTP (Trivial File Transfer Protocol) client
//!
//! This module implements the client side of
//! [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350) TFTP Protocol version 2:
//! lockstep get and put with 512-byte blocks and timeout-driven retransmission.
//! Option negotiation (RFC 2347 and its extensions) is not supported.
//!
//! ## Module Structure
//!
//! ```text
//! tftp/
//! ├── core/           # Core protocol implementation
//! │   ├── packet      # Packet serialization/deserialization
//! │   ├── socket      # Datagram transport abstraction
//! │   └── retry       # Bounded retransmission of one exchange
//! │
//! └── client/         # TFTP client
//!     ├── session     # Get/put state machine
//!     ├── client      # File-level facade
//!     └── config      # Client configuration
//! ```
//!
//! ## Usage Examples
//!
//! ### Download a file
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{Client, ClientConfig};
//! use std::path::Path;
//!
//! let config = ClientConfig::new("10.0.0.1".parse().unwrap(), 69);
//! let stats = Client::new(config)
//!     .get("pxelinux.0", Path::new("pxelinux.0"))
//!     .unwrap();
//! println!("{} bytes", stats.bytes);
//! ```
//!
//! ### Drive a session over your own transport
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tftpc::tftp::client::TransferSession;
//! use tftpc::tftp::core::{Retransmitter, UdpTransport};
//!
//! let server = "10.0.0.1:69".parse().unwrap();
//! let mut transport = UdpTransport::bind_for(server).unwrap();
//! let retry = Retransmitter::new(5, Duration::from_secs(5));
//! let mut output = Vec::new();
//! TransferSession::new(&mut transport, server, "motd", retry)
//!     .get(&mut output)
//!     .unwrap();
//! ```

// Submodules
pub mod client;
pub mod core;
