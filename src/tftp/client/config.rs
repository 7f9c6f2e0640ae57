use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Well-known TFTP request port
pub const DEFAULT_PORT: u16 = 69;
/// How long to wait for each response before retransmitting
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Total sends per exchange before giving up
pub const DEFAULT_RETRIES: u32 = 5;

/// TFTP client configuration
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tftpc::tftp::client::ClientConfig;
///
/// let config = ClientConfig::new("192.168.1.100".parse().unwrap(), 69)
///     .with_timeout(Duration::from_secs(2))
///     .with_retries(8);
/// assert_eq!(config.server_addr().port(), 69);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server IP address
    pub server_ip: IpAddr,
    /// Server port number
    pub server_port: u16,
    /// Timeout duration
    pub timeout: Duration,
    /// Attempts per exchange, the first send included
    pub retries: u32,
}

impl ClientConfig {
    /// Create new client configuration
    ///
    /// # Arguments
    ///
    /// * `server_ip` - Server IP address
    /// * `server_port` - Server port number (usually 69)
    pub fn new(server_ip: IpAddr, server_port: u16) -> Self {
        Self {
            server_ip,
            server_port,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
        }
    }

    /// Set timeout duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set number of attempts per exchange
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_ip, self.server_port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(IpAddr::from([127, 0, 0, 1]), DEFAULT_PORT)
    }
}
