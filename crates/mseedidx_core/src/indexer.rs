//! Per-file streaming driver: record stream in, file entry out.

use crate::aggregate::{AggregateConfig, SectionAggregator};
use crate::error::EngineError;
use crate::file_entry::FileEntry;
use crate::tolerance::ToleranceProvider;
use mseedidx_mseed::RecordReader;
use std::io::Read;
use tracing::debug;

/// Drive the reader to end of stream and aggregate everything it yields.
///
/// `updated_at` of every section is seeded with the file modification time,
/// falling back to the scan time for inputs that have none (stdin, URLs).
pub fn index_stream<R: Read>(
    reader: &mut RecordReader<R>,
    path: &str,
    file_mod_time: Option<i64>,
    scan_time: i64,
    config: AggregateConfig,
    tolerances: &dyn ToleranceProvider,
) -> Result<FileEntry, EngineError> {
    let mut aggregator =
        SectionAggregator::new(config, tolerances, file_mod_time.unwrap_or(scan_time));
    let mut records = 0u64;

    loop {
        let record = reader.next_record().map_err(|source| EngineError::Decode {
            path: path.to_string(),
            source,
        })?;
        match record {
            Some(record) => {
                aggregator.push(&record);
                records += 1;
            }
            None => break,
        }
    }

    let (sections, sha256) = aggregator.finish();
    debug!(path, records, sections = sections.len(), "scan complete");
    FileEntry::finalize(path.to_string(), file_mod_time, scan_time, sections, sha256)
}
