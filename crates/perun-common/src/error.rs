//! Error types for perun-common.

use thiserror::Error;

/// Common error type for Perun cursor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Invalid magic bytes encountered.
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// Back-patch target lies outside the written buffer.
    #[error("patch at {position}..{end} is outside the buffer of {len} bytes")]
    PatchOutOfRange {
        position: usize,
        end: usize,
        len: usize,
    },

    /// Invalid identifier format.
    #[error("invalid asset id: {0}")]
    InvalidAssetId(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
