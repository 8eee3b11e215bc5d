//! Error types for perun-schema.
//!
//! Schema errors are fatal by design: an offset-based container cannot be
//! resynchronized after a misread, so there is no partial recovery path.

use thiserror::Error;

/// Error type for schema encode/decode operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Cursor-level failure (EOF, bad magic, patch range).
    #[error(transparent)]
    Common(#[from] perun_common::Error),

    /// Container header names a structure hash absent from the catalog.
    #[error("unknown structure hash 0x{hash:08X}: not present in the record catalog")]
    UnknownStructHash { hash: u32 },

    /// Container resolved to a different structure than the caller requested.
    #[error("container holds a {actual}, expected a {expected}")]
    WrongStruct {
        expected: &'static str,
        actual: String,
    },

    /// A read or write accessed a field with the wrong codec.
    #[error("{structure}.{field}: declared {declared}, accessed as {accessed}")]
    CodecMismatch {
        structure: &'static str,
        field: &'static str,
        declared: String,
        accessed: &'static str,
    },

    /// A read or write accessed more fields than the definition declares.
    #[error("{structure}: accessed past the last declared field")]
    FieldOverrun { structure: &'static str },

    /// A read or write completed without consuming every declared field.
    #[error("{structure}: only {used} of {declared} fields accessed")]
    FieldUnderrun {
        structure: &'static str,
        declared: usize,
        used: usize,
    },

    /// Fixed-array field written with the wrong element count.
    #[error("{structure}.{field}: declared length {declared}, got {actual}")]
    LengthMismatch {
        structure: &'static str,
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    /// Fixed-length text field cannot hold the value.
    #[error("field {field}: string of {len} bytes exceeds the fixed capacity of {max}")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Pointer-list offset resolves outside the buffer.
    #[error("pointer record at {position}: relative offset {offset} leaves the buffer of {len} bytes")]
    OffsetOutOfRange {
        position: usize,
        offset: i64,
        len: usize,
    },

    /// Pointer-list payload cannot fit in the bytes that remain.
    #[error("pointer payload of {count} elements exceeds the {available} bytes available")]
    TruncatedPayload { count: u32, available: usize },

    /// Container format version newer than this implementation understands.
    #[error("unsupported container format version {0}")]
    UnsupportedVersion(u16),

    /// Container record kind field holds an unknown value.
    #[error("invalid container record kind {0}")]
    InvalidRecordKind(u32),
}

/// Result type alias using the schema Error type.
pub type Result<T> = std::result::Result<T, Error>;
