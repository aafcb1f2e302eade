//! Error types for the codec, record and protocol layers.

use std::fmt;
use std::io;

use thiserror::Error;

/// Classification of a wire fault, for callers that branch on the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The data ended in the middle of a structure, or a length was malformed.
    Truncated,
    /// The transport reached EOF or was reset.
    ConnectionClosed,
    /// A sentinel, opcode or identifier did not match what the protocol expects.
    ProtocolDesync,
    /// A compressed block could not be inflated.
    DecompressionFailed,
    /// A record field or list index does not exist.
    NotFound,
    /// A write targeted an existing field of a different type.
    TypeMismatch,
    /// Any other transport error.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Truncated => "truncated",
            ErrorKind::ConnectionClosed => "connection closed",
            ErrorKind::ProtocolDesync => "protocol desync",
            ErrorKind::DecompressionFailed => "decompression failed",
            ErrorKind::NotFound => "not found",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Io => "i/o",
        };
        f.write_str(s)
    }
}

/// Errors raised while encoding, decoding or driving the protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// Stream ended mid-structure or carried a malformed length.
    #[error("Truncated data: {0}")]
    Truncated(String),

    /// Transport EOF or reset.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Sentinel, opcode or name mismatch.
    #[error("Protocol desync: {0}")]
    ProtocolDesync(String),

    /// Corrupt compressed block.
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Record field or index lookup miss.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write to an existing field with a different type. The record is left unchanged.
    #[error("Type mismatch on field '{field}': field is {actual}, value is {requested}")]
    TypeMismatch {
        field: String,
        actual: &'static str,
        requested: &'static str,
    },

    /// Other transport failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Truncated(_) => ErrorKind::Truncated,
            Error::ConnectionClosed => ErrorKind::ConnectionClosed,
            Error::ProtocolDesync(_) => ErrorKind::ProtocolDesync,
            Error::DecompressionFailed(_) => ErrorKind::DecompressionFailed,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the fault ends a streaming session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.kind(), ErrorKind::NotFound | ErrorKind::TypeMismatch)
    }

    /// Whether the underlying data simply ran out (buffer or socket).
    pub fn is_eof(&self) -> bool {
        matches!(self.kind(), ErrorKind::Truncated | ErrorKind::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
