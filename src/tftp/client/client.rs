use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::config::ClientConfig;
use super::error::TransferError;
use super::session::{TransferSession, TransferStats};
use crate::tftp::core::{Retransmitter, UdpTransport};

/// TFTP client
///
/// Supports file upload (PUT) and download (GET) operations
///
/// # Example
///
/// ```rust,no_run
/// use tftpc::tftp::client::{Client, ClientConfig};
/// use std::path::Path;
///
/// let config = ClientConfig::new("192.168.1.100".parse().unwrap(), 69);
/// let client = Client::new(config);
///
/// // Download file
/// client.get("remote.txt", Path::new("local.txt")).unwrap();
///
/// // Upload file
/// client.put(Path::new("local.txt"), "remote.txt").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    /// Create a new TFTP client
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Download a file from the server (RRQ - Read Request)
    ///
    /// # Arguments
    ///
    /// * `remote_file` - File name on the server
    /// * `local_file` - Local save path
    pub fn get(&self, remote_file: &str, local_file: &Path) -> Result<TransferStats, TransferError> {
        log::info!("Downloading {} to {}", remote_file, local_file.display());

        // The local file is ready before anything goes on the wire
        let file = File::create(local_file).map_err(|e| local_io(local_file, e))?;
        let mut sink = BufWriter::new(file);

        let server_addr = self.config.server_addr();
        let mut transport = UdpTransport::bind_for(server_addr)?;
        let mut session =
            TransferSession::new(&mut transport, server_addr, remote_file, self.retransmitter());
        let stats = session.get(&mut sink)?;

        sink.into_inner()
            .map_err(|e| local_io(local_file, e.into_error()))?
            .sync_all()
            .map_err(|e| local_io(local_file, e))?;

        log::info!(
            "Download complete: {} ({} bytes, {} blocks)",
            local_file.display(),
            stats.bytes,
            stats.blocks
        );
        Ok(stats)
    }

    /// Upload a file to the server (WRQ - Write Request)
    ///
    /// # Arguments
    ///
    /// * `local_file` - Local file path
    /// * `remote_file` - File name on the server
    pub fn put(&self, local_file: &Path, remote_file: &str) -> Result<TransferStats, TransferError> {
        log::info!("Uploading {} to {}", local_file.display(), remote_file);

        let mut file = File::open(local_file).map_err(|e| local_io(local_file, e))?;

        let server_addr = self.config.server_addr();
        let mut transport = UdpTransport::bind_for(server_addr)?;
        let mut session =
            TransferSession::new(&mut transport, server_addr, remote_file, self.retransmitter());
        let stats = session.put(&mut file)?;

        log::info!(
            "Upload complete: {} ({} bytes, {} blocks)",
            remote_file,
            stats.bytes,
            stats.blocks
        );
        Ok(stats)
    }

    fn retransmitter(&self) -> Retransmitter {
        Retransmitter::new(self.config.retries, self.config.timeout)
    }
}

fn local_io(path: &Path, source: std::io::Error) -> TransferError {
    TransferError::LocalIo {
        file: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_of_missing_file_fails_before_network() {
        let client = Client::new(ClientConfig::default());
        let err = client
            .put(Path::new("/nonexistent/dir/file.bin"), "file.bin")
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::LocalIo { ref file, .. } if file == "/nonexistent/dir/file.bin"
        ));
    }

    #[test]
    fn get_into_missing_directory_fails_before_network() {
        let client = Client::new(ClientConfig::default());
        let err = client
            .get("file.bin", Path::new("/nonexistent/dir/file.bin"))
            .unwrap_err();

        assert!(matches!(err, TransferError::LocalIo { .. }));
    }
}
