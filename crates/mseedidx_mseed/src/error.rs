//! Decoder error types.

use thiserror::Error;

/// Errors produced while reading a record stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// I/O failure on the underlying stream.
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failure for URL inputs.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Bytes at the given offset are not a recognizable record.
    #[error("unrecognized data at byte offset {offset}")]
    NotData { offset: u64 },

    /// The stream ended inside a record.
    #[error("truncated record at byte offset {offset}: expected {expected} bytes")]
    Truncated { offset: u64, expected: usize },

    /// A miniSEED 2 record without a Blockette 1000 has no declared length.
    #[error("record at byte offset {offset} has no Blockette 1000")]
    MissingBlockette1000 { offset: u64 },

    /// A header field holds an impossible value.
    #[error("invalid record header at byte offset {offset}: {reason}")]
    BadHeader { offset: u64, reason: String },
}
