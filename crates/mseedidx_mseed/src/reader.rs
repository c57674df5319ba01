//! Streaming record reader.
//!
//! Presents a uniform record stream over local files, standard input, and
//! URL sources, tracking the absolute byte offset of every record. Records
//! are variable-length; each probe decodes enough of the header to learn
//! the length of the record it starts.

use crate::leapsecond::LeapSeconds;
use crate::record::RawRecord;
use crate::v2;
use crate::v3;
use crate::DecodeError;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Outcome of probing the buffer head for a record of one format.
pub(crate) enum Probe {
    /// Undecidable until at least this many bytes are buffered.
    Need(usize),
    /// The buffer head is not a record of this format.
    NoMatch,
    /// A header was decoded; the record spans `length` bytes.
    Header(ProbedHeader),
}

/// Header fields decoded by a format probe.
pub(crate) struct ProbedHeader {
    pub length: usize,
    pub source_id: String,
    pub pub_version: u8,
    pub quality: Option<char>,
    pub format_version: u8,
    pub start_time: i64,
    pub sample_count: i64,
    pub sample_rate: f64,
}

/// Reader behavior knobs.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// Silently skip bytes that are not recognizable records.
    pub skip_non_data: bool,
}

/// An opened input stream plus the metadata the indexer needs.
pub struct Input {
    /// The path, URL, or `-` exactly as given.
    pub name: String,
    /// Modification time, local files only.
    pub mod_time: Option<i64>,
    stream: Box<dyn Read>,
}

impl Input {
    /// Open a path, the literal `-` for standard input, or an HTTP(S) URL.
    pub fn open(spec: &str) -> Result<Self, DecodeError> {
        if spec == "-" {
            return Ok(Self {
                name: spec.to_string(),
                mod_time: None,
                stream: Box::new(std::io::stdin()),
            });
        }
        if spec.starts_with("http://") || spec.starts_with("https://") {
            let response = reqwest::blocking::get(spec)?.error_for_status()?;
            return Ok(Self {
                name: spec.to_string(),
                mod_time: None,
                stream: Box::new(response),
            });
        }
        let path = Path::new(spec);
        let file = File::open(path)?;
        let mod_time = file
            .metadata()?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);
        Ok(Self {
            name: spec.to_string(),
            mod_time,
            stream: Box::new(file),
        })
    }

    /// Wrap the stream in a record reader.
    pub fn into_reader(self, config: ReaderConfig, leap: LeapSeconds) -> RecordReader<Box<dyn Read>> {
        RecordReader::new(self.stream, config, leap)
    }
}

/// Lazy record stream over any byte source.
pub struct RecordReader<R: Read> {
    inner: R,
    config: ReaderConfig,
    leap: LeapSeconds,
    /// Window of unconsumed bytes starting at `offset`.
    buf: Vec<u8>,
    offset: u64,
    eof: bool,
    skipped: u64,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, config: ReaderConfig, leap: LeapSeconds) -> Self {
        Self {
            inner,
            config,
            leap,
            buf: Vec::with_capacity(8192),
            offset: 0,
            eof: false,
            skipped: 0,
        }
    }

    /// Total bytes skipped as non-data so far.
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }

    /// Decode the next record, or `None` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<RawRecord>, DecodeError> {
        loop {
            self.fill_to(v2_probe_floor())?;
            if self.buf.is_empty() {
                return Ok(None);
            }

            match self.probe_formats()? {
                Probe::Header(header) => {
                    if !self.fill_to(header.length)? {
                        if self.config.skip_non_data {
                            self.skip_bytes(self.buf.len());
                            continue;
                        }
                        return Err(DecodeError::Truncated {
                            offset: self.offset,
                            expected: header.length,
                        });
                    }
                    return Ok(Some(self.take_record(header)));
                }
                Probe::Need(want) => {
                    // EOF arrived mid-header.
                    if !self.fill_to(want)? {
                        if self.config.skip_non_data {
                            self.skip_bytes(self.buf.len());
                            continue;
                        }
                        return Err(DecodeError::Truncated {
                            offset: self.offset,
                            expected: want,
                        });
                    }
                }
                Probe::NoMatch => {
                    if self.config.skip_non_data {
                        self.skip_bytes(1);
                        continue;
                    }
                    return Err(DecodeError::NotData {
                        offset: self.offset,
                    });
                }
            }
        }
    }

    fn probe_formats(&self) -> Result<Probe, DecodeError> {
        match v3::probe(&self.buf, &self.leap) {
            Probe::NoMatch => {}
            other => return Ok(other),
        }
        match v2::probe(&self.buf, self.offset, &self.leap) {
            Ok(probe) => Ok(probe),
            // With skip-non-data, a near-miss header is just more noise.
            Err(_) if self.config.skip_non_data => Ok(Probe::NoMatch),
            Err(err) => Err(err),
        }
    }

    fn take_record(&mut self, header: ProbedHeader) -> RawRecord {
        let raw: Vec<u8> = self.buf.drain(..header.length).collect();
        let record = RawRecord {
            offset: self.offset,
            length: header.length as u32,
            source_id: header.source_id,
            pub_version: header.pub_version,
            quality: header.quality,
            format_version: header.format_version,
            start_time: header.start_time,
            sample_count: header.sample_count,
            sample_rate: header.sample_rate,
            raw,
        };
        self.offset += header.length as u64;
        record
    }

    fn skip_bytes(&mut self, count: usize) {
        let count = count.min(self.buf.len());
        self.buf.drain(..count);
        self.offset += count as u64;
        self.skipped += count as u64;
        if self.skipped % (1 << 20) < count as u64 {
            debug!(offset = self.offset, skipped = self.skipped, "skipping non-data");
        }
    }

    /// Buffer at least `want` bytes; false when EOF lands first.
    fn fill_to(&mut self, want: usize) -> Result<bool, DecodeError> {
        let mut chunk = [0u8; 8192];
        while self.buf.len() < want && !self.eof {
            let read = self.inner.read(&mut chunk)?;
            if read == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..read]);
            }
        }
        Ok(self.buf.len() >= want)
    }
}

/// Smallest prefix either format can decide on.
fn v2_probe_floor() -> usize {
    48
}

#[cfg(test)]
mod tests {
    use super::*;
    use mseedidx_testutil::{v3_record, V3RecordSpec};

    fn reader_over(bytes: Vec<u8>, skip: bool) -> RecordReader<std::io::Cursor<Vec<u8>>> {
        RecordReader::new(
            std::io::Cursor::new(bytes),
            ReaderConfig {
                skip_non_data: skip,
            },
            LeapSeconds::none(),
        )
    }

    fn spec(start_s: i64) -> V3RecordSpec {
        V3RecordSpec {
            sid: "FDSN:XX_TEST__B_H_Z".to_string(),
            start_ns: start_s * 1_000_000_000,
            sample_rate: 100.0,
            sample_count: 3000,
            pub_version: 1,
            payload_len: 472,
        }
    }

    #[test]
    fn reads_adjacent_records_with_offsets() {
        let mut bytes = v3_record(&spec(0));
        let first_len = bytes.len() as u64;
        bytes.extend(v3_record(&spec(30)));

        let mut reader = reader_over(bytes, false);
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(first.format_version, 3);
        assert_eq!(first.source_id, "FDSN:XX_TEST__B_H_Z");
        assert_eq!(first.sample_rate, 100.0);

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.offset, first_len);
        assert_eq!(second.start_time, 30_000_000_000);

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn garbage_is_fatal_without_skip() {
        let mut bytes = vec![0xAAu8; 16];
        bytes.extend(v3_record(&spec(0)));
        let mut reader = reader_over(bytes, false);
        match reader.next_record() {
            Err(DecodeError::NotData { offset }) => assert_eq!(offset, 0),
            other => panic!("expected NotData, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_skipped_with_flag() {
        let mut bytes = vec![0xAAu8; 16];
        bytes.extend(v3_record(&spec(0)));
        let mut reader = reader_over(bytes, true);
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.offset, 16);
        assert_eq!(reader.skipped_bytes(), 16);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn truncated_tail_is_fatal_without_skip() {
        let mut bytes = v3_record(&spec(0));
        bytes.truncate(bytes.len() - 10);
        let mut reader = reader_over(bytes, false);
        assert!(matches!(
            reader.next_record(),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn empty_stream_is_clean_end() {
        let mut reader = reader_over(Vec::new(), false);
        assert!(reader.next_record().unwrap().is_none());
    }
}
