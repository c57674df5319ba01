//! JSON summary document types.
//!
//! An alternative sink: one document describing every scanned file, with
//! per-section objects mirroring what the index store would receive.

use crate::file_entry::FileEntry;
use crate::section::Section;
use mseedidx_mseed::nstime::{self, NsTime};
use serde::{Deserialize, Serialize};

const MEDIA_TYPE: &str = "application/vnd.fdsn.mseed";

/// Media type for a format generation; versioned only for 2 and 3.
pub fn content_type(format_version: u8) -> String {
    match format_version {
        2 => format!("{MEDIA_TYPE};version=2"),
        3 => format!("{MEDIA_TYPE};version=3"),
        _ => MEDIA_TYPE.to_string(),
    }
}

/// One `(time, byte_offset)` seek point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeIndexSummary {
    pub time: NsTime,
    pub byte_offset: u64,
}

/// One contiguous coverage interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanSummary {
    pub start_time: NsTime,
    pub end_time: NsTime,
    pub sample_rate: f64,
}

/// Per-section summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSummary {
    pub source_id: String,
    pub publication_version: u8,
    pub start_time: NsTime,
    pub start_time_str: String,
    pub end_time: NsTime,
    pub end_time_str: String,
    pub sample_rate: f64,
    pub byte_offset: u64,
    pub byte_count: u64,
    pub md5: String,
    pub time_ordered_records: bool,
    /// Seek index; absent when it would not represent the whole section.
    pub ts_time_byteoffset: Option<Vec<TimeIndexSummary>>,
    pub ts_timespans: Vec<SpanSummary>,
}

/// Per-file summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileSummary {
    pub path: String,
    pub content_type: String,
    pub sha256: String,
    /// Present for local paths only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_modtime: Option<String>,
    pub path_indextime: String,
    pub earliest: NsTime,
    pub earliest_str: String,
    pub latest: NsTime,
    pub latest_str: String,
    pub content: Vec<SectionSummary>,
}

impl From<&Section> for SectionSummary {
    fn from(section: &Section) -> Self {
        let ts_time_byteoffset = section.time_index_valid().then(|| {
            section
                .time_index
                .iter()
                .map(|entry| TimeIndexSummary {
                    time: entry.time,
                    byte_offset: entry.byte_offset,
                })
                .collect()
        });
        Self {
            source_id: section.source_id.clone(),
            publication_version: section.pub_version,
            start_time: section.earliest,
            start_time_str: nstime::iso_micro(section.earliest),
            end_time: section.latest,
            end_time_str: nstime::iso_micro(section.latest),
            sample_rate: section.sample_rate,
            byte_offset: section.start_offset,
            byte_count: section.byte_count(),
            md5: section.md5.clone(),
            time_ordered_records: section.time_order,
            ts_time_byteoffset,
            ts_timespans: section
                .spans
                .iter()
                .map(|span| SpanSummary {
                    start_time: span.start,
                    end_time: span.end,
                    sample_rate: span.sample_rate,
                })
                .collect(),
        }
    }
}

impl From<&FileEntry> for FileSummary {
    fn from(file: &FileEntry) -> Self {
        // File-level content type: the common section version, base media
        // type when sections disagree.
        let mut versions = file.sections.iter().map(|s| s.format_version);
        let file_version = match versions.next() {
            Some(first) if versions.all(|v| v == first) => first,
            _ => 0,
        };
        Self {
            path: file.path.clone(),
            content_type: content_type(file_version),
            sha256: file.sha256.clone(),
            path_modtime: file.file_mod_time.map(nstime::iso_seconds),
            path_indextime: nstime::iso_seconds(file.scan_time),
            earliest: file.earliest,
            earliest_str: nstime::iso_micro(file.earliest),
            latest: file.latest,
            latest_str: nstime::iso_micro(file.latest),
            content: file.sections.iter().map(SectionSummary::from).collect(),
        }
    }
}
