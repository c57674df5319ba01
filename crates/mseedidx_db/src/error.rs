//! Store error types.

use mseedidx_mseed::SidError;
use thiserror::Error;

/// Errors from index reconciliation. Any of these aborts the current
/// file's transaction; nothing is partially applied.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, prepare, execute, or commit failure.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The configured table name is not a plain SQL identifier.
    #[error("invalid table name '{0}'")]
    BadTable(String),

    /// A `#` version suffix that does not parse as a number.
    #[error("cannot parse version from filename '{0}'")]
    Filename(String),

    /// A section's source identifier cannot be decomposed into codes.
    #[error(transparent)]
    SourceId(#[from] SidError),

    /// A serialized column exceeded the 8 MiB cap.
    #[error("{column} value has grown too large")]
    Oversize { column: &'static str },
}
