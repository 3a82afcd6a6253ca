//! Error taxonomy for the engine
//!
//! Worker-side errors are captured into [`LoadState`](crate::ingest::LoadState)
//! rather than crossing the thread boundary; accessor errors are ordinary
//! result values.

use thiserror::Error;

/// Errors produced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// File missing, permission denied, or a read failure. Fatal to a load:
    /// the coordinator transitions to Failed and nothing further is ingested.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A row that could not be parsed cleanly (field-count mismatch or an
    /// unterminated quote running to end of file). Recoverable: the row is
    /// flagged and ingestion continues.
    #[error("malformed row at byte offset {offset}")]
    MalformedRow { offset: u64 },

    /// Index past the currently loaded extent.
    #[error("row index {index} out of range (loaded rows: {len})")]
    OutOfRange { index: u64, len: u64 },

    /// The load or search this result belongs to was cancelled or superseded.
    /// Not a failure.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;
