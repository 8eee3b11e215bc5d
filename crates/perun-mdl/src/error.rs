//! Error types for perun-mdl.

use thiserror::Error;

/// Error type for model container operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Wire-format failure from the schema engine.
    #[error(transparent)]
    Schema(#[from] perun_schema::Error),

    /// Geometry batch had no packable mesh left after validation.
    #[error("geometry batch contains no packable mesh")]
    EmptyBatch,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the model Error type.
pub type Result<T> = std::result::Result<T, Error>;
