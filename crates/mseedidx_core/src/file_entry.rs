//! Per-file scan result.

use crate::error::EngineError;
use crate::section::Section;
use mseedidx_mseed::nstime::NsTime;

/// Everything learned from scanning one input, ready for reconciliation.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path, URL, or `-`, exactly as it will be stored.
    pub path: String,
    /// Modification time in epoch seconds; local files only.
    pub file_mod_time: Option<i64>,
    /// When this scan ran, epoch seconds.
    pub scan_time: i64,
    /// Minimum section earliest.
    pub earliest: NsTime,
    /// Maximum section latest.
    pub latest: NsTime,
    /// SHA-256 over the concatenated raw record bytes, 64 hex characters.
    ///
    /// With skip-non-data enabled this covers decoded records only, not
    /// every byte of the file.
    pub sha256: String,
    /// Sections in file order, non-overlapping in byte range.
    pub sections: Vec<Section>,
}

impl FileEntry {
    /// Assemble the entry and compute file-level extents.
    pub fn finalize(
        path: String,
        file_mod_time: Option<i64>,
        scan_time: i64,
        sections: Vec<Section>,
        sha256: String,
    ) -> Result<Self, EngineError> {
        let earliest = sections.iter().map(|s| s.earliest).min();
        let latest = sections.iter().map(|s| s.latest).max();
        let (earliest, latest) = match (earliest, latest) {
            (Some(earliest), Some(latest)) => (earliest, latest),
            _ => return Err(EngineError::NoTimeExtents { path }),
        };
        Ok(Self {
            path,
            file_mod_time,
            scan_time,
            earliest,
            latest,
            sha256,
            sections,
        })
    }
}
