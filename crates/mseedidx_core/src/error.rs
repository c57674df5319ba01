//! Engine error types.

use mseedidx_mseed::DecodeError;
use thiserror::Error;

/// Errors from scanning one input. All are fatal for the invocation;
/// the reconciler never sees a partially scanned file.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The record stream could not be decoded.
    #[error("cannot read {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DecodeError,
    },

    /// The stream produced no sections, so the file has no time extents.
    #[error("no time extents found for {path}")]
    NoTimeExtents { path: String },
}
