//! The section aggregation state machine.

use crate::hex_string;
use crate::section::{merge_into_spans, Section, Span, TimeIndexEntry};
use crate::tolerance::{rate_within, ToleranceProvider};
use md5::{Digest as _, Md5};
use mseedidx_mseed::nstime::{NsTime, NS_PER_SEC};
use mseedidx_mseed::RawRecord;
use sha2::{Digest as _, Sha256};

/// Aggregation knobs.
#[derive(Debug, Clone, Copy)]
pub struct AggregateConfig {
    /// Seconds between time index entries within a section.
    pub sub_index_interval_secs: u32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            sub_index_interval_secs: 3600,
        }
    }
}

impl AggregateConfig {
    fn interval_ns(&self) -> i64 {
        i64::from(self.sub_index_interval_secs) * NS_PER_SEC
    }
}

struct OpenSection {
    section: Section,
    digest: Md5,
    next_index_time: NsTime,
}

/// Consumes one file's record sequence and emits its sections.
///
/// Holds at most one open section; a record either extends it (same
/// identifiers, byte-adjacent) or closes it and opens the next one.
pub struct SectionAggregator<'t> {
    config: AggregateConfig,
    tolerances: &'t dyn ToleranceProvider,
    /// Seed for each section's `updated_at`.
    updated_seed: i64,
    open: Option<OpenSection>,
    closed: Vec<Section>,
    prev_start: Option<NsTime>,
    file_digest: Sha256,
}

impl<'t> SectionAggregator<'t> {
    pub fn new(
        config: AggregateConfig,
        tolerances: &'t dyn ToleranceProvider,
        updated_seed: i64,
    ) -> Self {
        Self {
            config,
            tolerances,
            updated_seed,
            open: None,
            closed: Vec::new(),
            prev_start: None,
            file_digest: Sha256::new(),
        }
    }

    /// Feed the next record in file order.
    pub fn push(&mut self, record: &RawRecord) {
        let extends = self.open.as_ref().is_some_and(|open| {
            open.section.source_id == record.source_id
                && open.section.pub_version == record.pub_version
                && record.offset == open.section.end_offset + 1
        });

        if extends {
            self.extend_open(record);
        } else {
            self.close_open();
            self.open = Some(self.start_section(record));
        }

        self.file_digest.update(&record.raw);
        self.prev_start = Some(record.start_time);
    }

    /// Close the last open section and return everything accumulated:
    /// the section list in file order and the whole-file SHA-256.
    pub fn finish(mut self) -> (Vec<Section>, String) {
        self.close_open();
        let sha256 = hex_string(&self.file_digest.finalize());
        (self.closed, sha256)
    }

    fn extend_open(&mut self, record: &RawRecord) {
        let end = record.end_time();
        let interval = self.config.interval_ns();
        let time_tol = self.tolerances.time_tolerance(record);
        let rate_tol = self.tolerances.rate_tolerance(record);
        let prev_start = self.prev_start;

        let open = self.open.as_mut().expect("open section");
        let section = &mut open.section;

        section.end_offset = record.offset + u64::from(record.length) - 1;
        section.earliest = section.earliest.min(record.start_time);
        section.latest = section.latest.max(end);

        if record.sample_rate != 0.0
            && !rate_within(section.sample_rate, record.sample_rate, rate_tol)
        {
            section.rate_mismatch = true;
        }
        if section.format_version != record.format_version {
            section.format_version = 0;
        }
        if prev_start.is_some_and(|prev| record.start_time <= prev) {
            section.time_order = false;
        }

        if end > open.next_index_time {
            section.time_index.push(TimeIndexEntry {
                time: record.start_time,
                byte_offset: record.offset,
            });
            while open.next_index_time <= end {
                open.next_index_time += interval;
            }
        }

        if record.sample_rate != 0.0 {
            let time_tol_s = time_tol.unwrap_or(0.5 / record.sample_rate);
            merge_into_spans(
                &mut section.spans,
                record.start_time,
                end,
                record.sample_rate,
                (time_tol_s * NS_PER_SEC as f64).round() as i64,
                rate_tol,
                rate_within,
            );
        }
        open.digest.update(&record.raw);
    }

    fn start_section(&mut self, record: &RawRecord) -> OpenSection {
        let end = record.end_time();
        let interval = self.config.interval_ns();
        let mut next_index_time = record.start_time + interval;
        while next_index_time <= end {
            next_index_time += interval;
        }

        let spans = if record.sample_rate != 0.0 {
            vec![Span {
                start: record.start_time,
                end,
                sample_rate: record.sample_rate,
            }]
        } else {
            Vec::new()
        };

        let mut digest = Md5::new();
        digest.update(&record.raw);

        OpenSection {
            section: Section {
                source_id: record.source_id.clone(),
                pub_version: record.pub_version,
                quality: record.quality,
                start_offset: record.offset,
                end_offset: record.offset + u64::from(record.length) - 1,
                earliest: record.start_time,
                latest: end,
                format_version: record.format_version,
                sample_rate: record.sample_rate,
                rate_mismatch: false,
                time_order: true,
                updated_at: self.updated_seed,
                time_index: vec![TimeIndexEntry {
                    time: record.start_time,
                    byte_offset: record.offset,
                }],
                spans,
                md5: String::new(),
            },
            digest,
            next_index_time,
        }
    }

    fn close_open(&mut self) {
        if let Some(open) = self.open.take() {
            let mut section = open.section;
            section.md5 = hex_string(&open.digest.finalize());
            self.closed.push(section);
        }
    }
}
