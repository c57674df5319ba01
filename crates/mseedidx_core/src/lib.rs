//! Indexing engine: groups a file's records into contiguous sections and
//! maintains the per-section aggregates the index store persists.
//!
//! A *section* is a maximal run of byte-adjacent records sharing a source
//! identifier and publication version. While a section is open the engine
//! tracks time extents, a time→offset seek index, contiguous coverage
//! spans, sample-rate consistency, and an incremental content digest.

mod aggregate;
mod error;
mod file_entry;
mod indexer;
mod section;
mod summary;
mod tolerance;

pub use aggregate::{AggregateConfig, SectionAggregator};
pub use error::EngineError;
pub use file_entry::FileEntry;
pub use indexer::index_stream;
pub use section::{Section, Span, TimeIndexEntry};
pub use summary::{content_type, FileSummary, SectionSummary, SpanSummary, TimeIndexSummary};
pub use tolerance::{rate_within, FixedTolerances, ToleranceProvider};

use std::fmt::Write as _;

/// Lowercase hex encoding for digest output.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
