use std::fmt;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::tftp::core::{EncodeError, ErrorCode};

/// ERROR packet received from the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: u16,
    pub message: String,
}

impl RemoteError {
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    /// Standard text for the code, or the peer's own message when the code
    /// is 0 or outside the standard table
    pub fn text(&self) -> &str {
        match self.error_code() {
            Some(ErrorCode::NotDefined) | None => &self.message,
            Some(code) => code.description(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.text())?;
        if self.text() != self.message && !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

/// Terminal outcome of a failed transfer
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("server error {0}")]
    Remote(RemoteError),
    #[error("no response from {peer} after {attempts} attempts")]
    NetworkTimeout { peer: SocketAddr, attempts: u32 },
    #[error("local I/O error on {file}")]
    LocalIo {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("socket error")]
    Socket(#[from] io::Error),
    #[error("cannot frame request")]
    Encode(#[from] EncodeError),
    #[error("transfer session already used")]
    SessionReused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_use_the_standard_text() {
        let err = RemoteError {
            code: 1,
            message: "no such file: boot.img".to_string(),
        };
        assert_eq!(err.text(), "File not found.");
        assert_eq!(
            err.to_string(),
            "1: File not found. (no such file: boot.img)"
        );
    }

    #[test]
    fn code_zero_and_unknown_codes_fall_back_to_the_message() {
        let undefined = RemoteError {
            code: 0,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(undefined.text(), "quota exceeded");
        assert_eq!(undefined.to_string(), "0: quota exceeded");

        let unknown = RemoteError {
            code: 42,
            message: "vendor specific".to_string(),
        };
        assert_eq!(unknown.error_code(), None);
        assert_eq!(unknown.text(), "vendor specific");
    }

    #[test]
    fn wrapped_io_errors_leave_the_cause_to_the_source_chain() {
        let err = TransferError::LocalIo {
            file: "data.bin".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "local I/O error on data.bin");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("missing".to_string())
        );

        let socket = TransferError::from(io::Error::other("refused"));
        assert_eq!(socket.to_string(), "socket error");
        assert!(std::error::Error::source(&socket).is_some());
    }
}
