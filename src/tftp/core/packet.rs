//! TFTP packet serialization and deserialization (RFC 1350 §5)
//!
//! ```text
//!  RRQ/WRQ   | 01/02 | filename | 0 | mode | 0 |
//!  DATA      | 03    | block #  | payload (0..512) |
//!  ACK       | 04    | block #  |
//!  ERROR     | 05    | code     | message | 0 |
//! ```
//!
//! All integers are big-endian. Nothing here knows about sessions: a DATA
//! packet with an unexpected block number decodes fine.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Maximum payload carried by one DATA packet
pub const BLOCK_SIZE: usize = 512;

/// Largest well-formed DATA datagram (opcode + block + payload)
pub const MAX_PACKET_SIZE: usize = 4 + BLOCK_SIZE;

const OPCODE_RRQ: u16 = 1;
const OPCODE_WRQ: u16 = 2;
const OPCODE_DATA: u16 = 3;
const OPCODE_ACK: u16 = 4;
const OPCODE_ERROR: u16 = 5;

/// Transfer mode named in a read or write request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Netascii,
    Octet,
    Mail,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Netascii => "netascii",
            Mode::Octet => "octet",
            Mode::Mail => "mail",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DecodeError;

    /// Mode names are case-insensitive on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netascii" => Ok(Mode::Netascii),
            "octet" => Ok(Mode::Octet),
            "mail" => Ok(Mode::Mail),
            _ => Err(DecodeError::UnknownMode(s.to_string())),
        }
    }
}

/// Standard TFTP error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotDefined,
    FileNotFound,
    AccessViolation,
    DiskFull,
    IllegalOperation,
    UnknownTransferId,
    FileExists,
    NoSuchUser,
}

impl ErrorCode {
    /// Map a wire code to a known error, `None` for codes outside 0-7
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0 => ErrorCode::NotDefined,
            1 => ErrorCode::FileNotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTransferId,
            6 => ErrorCode::FileExists,
            7 => ErrorCode::NoSuchUser,
            _ => return None,
        })
    }

    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::NotDefined => 0,
            ErrorCode::FileNotFound => 1,
            ErrorCode::AccessViolation => 2,
            ErrorCode::DiskFull => 3,
            ErrorCode::IllegalOperation => 4,
            ErrorCode::UnknownTransferId => 5,
            ErrorCode::FileExists => 6,
            ErrorCode::NoSuchUser => 7,
        }
    }

    /// Fixed human-readable text for this code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::NotDefined => "Not defined, see error message (if any).",
            ErrorCode::FileNotFound => "File not found.",
            ErrorCode::AccessViolation => "Access violation.",
            ErrorCode::DiskFull => "Disk full or allocation exceeded.",
            ErrorCode::IllegalOperation => "Illegal TFTP operation.",
            ErrorCode::UnknownTransferId => "Unknown transfer ID.",
            ErrorCode::FileExists => "File already exists.",
            ErrorCode::NoSuchUser => "No such user.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single TFTP datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq { filename: String, mode: Mode },
    Wrq { filename: String, mode: Mode },
    Data { block_num: u16, data: Vec<u8> },
    Ack(u16),
    Error { code: u16, msg: String },
}

/// Errors raised while framing an outgoing packet
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} contains an embedded NUL byte")]
    EmbeddedNul { field: &'static str },
    #[error("data payload of {0} bytes exceeds the {max}-byte block size", max = BLOCK_SIZE)]
    PayloadTooLarge(usize),
}

/// Errors raised while parsing an incoming datagram
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("datagram of {len} bytes is too short for opcode {opcode}")]
    Truncated { opcode: u16, len: usize },
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
    #[error("request is missing its NUL terminator")]
    MissingTerminator,
    #[error("request field is not valid UTF-8")]
    InvalidText,
    #[error("unknown transfer mode {0:?}")]
    UnknownMode(String),
    #[error("data payload of {0} bytes exceeds the {max}-byte block size", max = BLOCK_SIZE)]
    PayloadTooLarge(usize),
    #[error("acknowledgement has {0} trailing bytes")]
    TrailingBytes(usize),
}

impl Packet {
    fn opcode(&self) -> u16 {
        match self {
            Packet::Rrq { .. } => OPCODE_RRQ,
            Packet::Wrq { .. } => OPCODE_WRQ,
            Packet::Data { .. } => OPCODE_DATA,
            Packet::Ack(_) => OPCODE_ACK,
            Packet::Error { .. } => OPCODE_ERROR,
        }
    }

    /// Build an ERROR packet carrying the standard text for `code`
    pub fn error(code: ErrorCode) -> Self {
        Packet::Error {
            code: code.code(),
            msg: code.description().to_string(),
        }
    }

    /// Serialize the packet into wire format
    pub fn serialize(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::with_capacity(MAX_PACKET_SIZE);
        buf.extend_from_slice(&self.opcode().to_be_bytes());

        match self {
            Packet::Rrq { filename, mode } | Packet::Wrq { filename, mode } => {
                push_text(&mut buf, filename, "filename")?;
                push_text(&mut buf, mode.as_str(), "mode")?;
            }
            Packet::Data { block_num, data } => {
                if data.len() > BLOCK_SIZE {
                    return Err(EncodeError::PayloadTooLarge(data.len()));
                }
                buf.extend_from_slice(&block_num.to_be_bytes());
                buf.extend_from_slice(data);
            }
            Packet::Ack(block_num) => {
                buf.extend_from_slice(&block_num.to_be_bytes());
            }
            Packet::Error { code, msg } => {
                buf.extend_from_slice(&code.to_be_bytes());
                push_text(&mut buf, msg, "error message")?;
            }
        }

        Ok(buf)
    }

    /// Parse a raw datagram
    pub fn deserialize(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < 2 {
            return Err(DecodeError::Truncated {
                opcode: 0,
                len: buf.len(),
            });
        }
        let opcode = u16::from_be_bytes([buf[0], buf[1]]);
        let body = &buf[2..];

        match opcode {
            OPCODE_RRQ | OPCODE_WRQ => {
                let (filename, rest) = take_text(body)?;
                let (mode, _) = take_text(rest)?;
                let mode = mode.parse()?;
                Ok(if opcode == OPCODE_RRQ {
                    Packet::Rrq { filename, mode }
                } else {
                    Packet::Wrq { filename, mode }
                })
            }
            OPCODE_DATA => {
                let block_num = read_u16(opcode, buf)?;
                let data = &body[2..];
                if data.len() > BLOCK_SIZE {
                    return Err(DecodeError::PayloadTooLarge(data.len()));
                }
                Ok(Packet::Data {
                    block_num,
                    data: data.to_vec(),
                })
            }
            OPCODE_ACK => {
                let block_num = read_u16(opcode, buf)?;
                if buf.len() > 4 {
                    return Err(DecodeError::TrailingBytes(buf.len() - 4));
                }
                Ok(Packet::Ack(block_num))
            }
            OPCODE_ERROR => {
                let code = read_u16(opcode, buf)?;
                // Some servers omit the final NUL; take the message up to the
                // end of the datagram in that case.
                let msg = &body[2..];
                let end = msg.iter().position(|&b| b == 0).unwrap_or(msg.len());
                Ok(Packet::Error {
                    code,
                    msg: String::from_utf8_lossy(&msg[..end]).into_owned(),
                })
            }
            other => Err(DecodeError::UnknownOpcode(other)),
        }
    }
}

fn push_text(buf: &mut Vec<u8>, text: &str, field: &'static str) -> Result<(), EncodeError> {
    if text.as_bytes().contains(&0) {
        return Err(EncodeError::EmbeddedNul { field });
    }
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
    Ok(())
}

fn take_text(buf: &[u8]) -> Result<(String, &[u8]), DecodeError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or(DecodeError::MissingTerminator)?;
    let text = std::str::from_utf8(&buf[..end]).map_err(|_| DecodeError::InvalidText)?;
    Ok((text.to_string(), &buf[end + 1..]))
}

/// Read the 16-bit field following the opcode
fn read_u16(opcode: u16, buf: &[u8]) -> Result<u16, DecodeError> {
    match buf.get(2..4) {
        Some(field) => Ok(u16::from_be_bytes([field[0], field[1]])),
        None => Err(DecodeError::Truncated {
            opcode,
            len: buf.len(),
        }),
    }
}
