//! Decoded record view.

use crate::nstime::{NsTime, NS_PER_SEC};

/// A decoded record header with its position and raw bytes.
///
/// Sample payloads are not decoded; `raw` carries the complete record for
/// content hashing.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Byte position of the record's first byte in the logical stream.
    pub offset: u64,
    /// Total record length in bytes.
    pub length: u32,
    /// FDSN source identifier, e.g. `FDSN:XX_TEST__B_H_Z`.
    pub source_id: String,
    /// Publication version (mapped from the quality byte for v2 input).
    pub pub_version: u8,
    /// Legacy data quality indicator; `None` for miniSEED 3.
    pub quality: Option<char>,
    /// Record format generation: 2 or 3.
    pub format_version: u8,
    /// Time of the first sample, nanoseconds from the epoch.
    pub start_time: NsTime,
    /// Number of samples in the record.
    pub sample_count: i64,
    /// Nominal sample rate in Hz; 0.0 for non-time-series records.
    pub sample_rate: f64,
    /// The complete record bytes.
    pub raw: Vec<u8>,
}

impl RawRecord {
    /// Time of the last sample: `start + (sample_count - 1) / sample_rate`.
    ///
    /// Falls back to the start time when the record carries no samples or
    /// no rate.
    pub fn end_time(&self) -> NsTime {
        if self.sample_count > 0 && self.sample_rate > 0.0 {
            let span = (self.sample_count - 1) as f64 / self.sample_rate;
            self.start_time + (span * NS_PER_SEC as f64).round() as i64
        } else {
            self.start_time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: NsTime, count: i64, rate: f64) -> RawRecord {
        RawRecord {
            offset: 0,
            length: 512,
            source_id: "FDSN:XX_TEST__B_H_Z".to_string(),
            pub_version: 1,
            quality: None,
            format_version: 3,
            start_time: start,
            sample_count: count,
            sample_rate: rate,
            raw: Vec::new(),
        }
    }

    #[test]
    fn end_time_spans_samples() {
        // 3000 samples at 100 Hz cover 29.99 s past the start.
        let rec = record(0, 3000, 100.0);
        assert_eq!(rec.end_time(), 29_990_000_000);
    }

    #[test]
    fn end_time_degenerates_to_start() {
        assert_eq!(record(5, 0, 100.0).end_time(), 5);
        assert_eq!(record(5, 100, 0.0).end_time(), 5);
    }
}
