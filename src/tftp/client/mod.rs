//! TFTP client implementation
//!
//! - `client`: File-level get/put over a UDP socket
//! - `session`: The stop-and-wait transfer state machine
//! - `config`: Client configuration
//! - `error`: Transfer failure kinds

#[allow(clippy::module_inception)]
mod client;
mod config;
mod error;
pub mod session;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_PORT, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
pub use error::{RemoteError, TransferError};
pub use session::{Direction, SessionState, TransferSession, TransferStats};
