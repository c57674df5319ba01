//! Row serialization shared by the store backends.

use crate::error::StoreError;
use mseedidx_core::{FileEntry, Span, TimeIndexEntry};
use mseedidx_mseed::nstime::{self, NsTime};
use mseedidx_mseed::parse_sid;

/// Soft cap on any one serialized column value.
const MAX_SERIALIZED_LEN: usize = 8 * 1024 * 1024;

/// One index row, decomposed and ready for either backend's INSERT.
#[derive(Debug, Clone)]
pub struct SectionRow {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub quality: String,
    pub version: i64,
    pub earliest: NsTime,
    pub latest: NsTime,
    pub sample_rate: f64,
    pub byte_offset: i64,
    pub bytes: i64,
    pub hash: String,
    /// Seek index entries; `None` when the first entry is not the
    /// section's earliest time (the column serializes as NULL).
    pub time_index: Option<Vec<TimeIndexEntry>>,
    pub time_order: bool,
    pub spans: Vec<Span>,
    pub rate_mismatch: bool,
    /// Epoch seconds; rewritten by the preservation pass when a prior
    /// row carries the same identifiers and digest.
    pub updated: i64,
}

/// Decompose a file's sections into rows. Aborts the file when any
/// source identifier fails to parse.
pub fn build_rows(file: &FileEntry) -> Result<Vec<SectionRow>, StoreError> {
    file.sections
        .iter()
        .map(|section| {
            let nslc = parse_sid(&section.source_id)?;
            Ok(SectionRow {
                network: nslc.network,
                station: nslc.station,
                location: nslc.location,
                channel: nslc.channel,
                quality: section.quality.map(String::from).unwrap_or_default(),
                version: i64::from(section.pub_version),
                earliest: section.earliest,
                latest: section.latest,
                sample_rate: section.sample_rate,
                byte_offset: section.start_offset as i64,
                bytes: section.byte_count() as i64,
                hash: section.md5.clone(),
                time_index: section
                    .time_index_valid()
                    .then(|| section.time_index.clone()),
                time_order: section.time_order,
                spans: section.spans.clone(),
                rate_mismatch: section.rate_mismatch,
                updated: section.updated_at,
            })
        })
        .collect()
}

/// How a filename selects prior rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameFilter {
    /// Unversioned: exact match.
    Exact(String),
    /// `<base>#<number>`: LIKE pattern over the base, already escaped.
    Prefix(String),
}

/// Build the row filter for a path, honoring the `#<number>` version
/// suffix convention. The version itself is informational; it persists
/// inside the filename value.
pub fn filename_filter(path: &str) -> Result<FilenameFilter, StoreError> {
    match path.rsplit_once('#') {
        Some((base, suffix)) => {
            if leading_number(suffix).is_none() {
                return Err(StoreError::Filename(path.to_string()));
            }
            Ok(FilenameFilter::Prefix(format!("{}%", escape_like(base))))
        }
        None => Ok(FilenameFilter::Exact(path.to_string())),
    }
}

/// Longest numeric prefix, `strtod` style: `"2"` and `"2abc"` both
/// yield 2, a bare word yields nothing.
fn leading_number(text: &str) -> Option<f64> {
    (1..=text.len())
        .rev()
        .filter(|&n| text.is_char_boundary(n))
        .find_map(|n| text[..n].parse::<f64>().ok())
}

/// Escape LIKE metacharacters with backslash.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn capped(value: String, column: &'static str) -> Result<String, StoreError> {
    if value.len() > MAX_SERIALIZED_LEN {
        Err(StoreError::Oversize { column })
    } else {
        Ok(value)
    }
}

/// `time=>offset,...,latest=>0|1` — the embedded store's timeindex text.
pub fn timeindex_text(row: &SectionRow) -> Result<Option<String>, StoreError> {
    let Some(entries) = row.time_index.as_ref() else {
        return Ok(None);
    };
    let mut text = String::new();
    for entry in entries {
        text.push_str(&nstime::epoch_micro_string(entry.time));
        text.push_str("=>");
        text.push_str(&entry.byte_offset.to_string());
        text.push(',');
    }
    text.push_str(&format!("latest=>{}", i32::from(row.time_order)));
    capped(text, "timeindex").map(Some)
}

/// Quoted `"time"=>"offset"` pairs for the network store's hstore column.
pub fn timeindex_hstore(row: &SectionRow) -> Result<Option<String>, StoreError> {
    let Some(entries) = row.time_index.as_ref() else {
        return Ok(None);
    };
    let mut text = String::new();
    for entry in entries {
        text.push_str(&format!(
            "\"{}\"=>\"{}\",",
            nstime::epoch_micro_string(entry.time),
            entry.byte_offset
        ));
    }
    text.push_str(&format!("\"latest\"=>\"{}\"", i32::from(row.time_order)));
    capped(text, "timeindex").map(Some)
}

/// `[start:end],[start:end]` interval list for the embedded store.
pub fn timespans_text(row: &SectionRow) -> Result<Option<String>, StoreError> {
    if row.spans.is_empty() {
        return Ok(None);
    }
    let text = row
        .spans
        .iter()
        .map(|span| {
            format!(
                "[{}:{}]",
                nstime::epoch_micro_string(span.start),
                nstime::epoch_micro_string(span.end)
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    capped(text, "timespans").map(Some)
}

/// `{"[start,end]",...}` array literal for the network store's
/// `numrange[]` column; bounds are inclusive.
pub fn timespans_pg_array(row: &SectionRow) -> Result<Option<String>, StoreError> {
    if row.spans.is_empty() {
        return Ok(None);
    }
    let text = format!(
        "{{{}}}",
        row.spans
            .iter()
            .map(|span| {
                format!(
                    "\"[{},{}]\"",
                    nstime::epoch_micro_string(span.start),
                    nstime::epoch_micro_string(span.end)
                )
            })
            .collect::<Vec<_>>()
            .join(",")
    );
    capped(text, "timespans").map(Some)
}

/// Per-span rates, written only when the section saw a rate mismatch.
pub fn timerates_text(row: &SectionRow) -> Result<Option<String>, StoreError> {
    if !row.rate_mismatch || row.spans.is_empty() {
        return Ok(None);
    }
    let text = row
        .spans
        .iter()
        .map(|span| format_rate(span.sample_rate))
        .collect::<Vec<_>>()
        .join(",");
    capped(text, "timerates").map(Some)
}

/// `{rate,rate}` array literal for the network store's `numeric[]`.
pub fn timerates_pg_array(row: &SectionRow) -> Result<Option<String>, StoreError> {
    Ok(timerates_text(row)?.map(|text| format!("{{{text}}}")))
}

/// Sample rate with six significant digits, trailing zeros trimmed.
pub fn format_rate(rate: f64) -> String {
    if rate == 0.0 {
        return "0".to_string();
    }
    let magnitude = rate.abs().log10().floor() as i32;
    let decimals = (5 - magnitude).clamp(0, 17) as usize;
    let mut text = format!("{rate:.decimals$}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(spans: Vec<Span>, time_index: Option<Vec<TimeIndexEntry>>) -> SectionRow {
        SectionRow {
            network: "XX".into(),
            station: "TEST".into(),
            location: "".into(),
            channel: "BHZ".into(),
            quality: "".into(),
            version: 1,
            earliest: 0,
            latest: 89_990_000_000,
            sample_rate: 100.0,
            byte_offset: 0,
            bytes: 1536,
            hash: "0".repeat(32),
            time_index,
            time_order: true,
            spans,
            rate_mismatch: false,
            updated: 0,
        }
    }

    #[test]
    fn filename_filter_exact_and_versioned() {
        assert_eq!(
            filename_filter("/a/b.dat").unwrap(),
            FilenameFilter::Exact("/a/b.dat".into())
        );
        assert_eq!(
            filename_filter("/a/b.dat#2").unwrap(),
            FilenameFilter::Prefix("/a/b.dat%".into())
        );
        assert!(filename_filter("/a/b.dat#two").is_err());
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(
            filename_filter("/a/b_100%/f.dat#1").unwrap(),
            FilenameFilter::Prefix("/a/b\\_100\\%/f.dat%".into())
        );
    }

    #[test]
    fn timeindex_text_includes_latest_flag() {
        let row = row_with(
            Vec::new(),
            Some(vec![
                TimeIndexEntry {
                    time: 0,
                    byte_offset: 0,
                },
                TimeIndexEntry {
                    time: 3600_000_000_000,
                    byte_offset: 4096,
                },
            ]),
        );
        assert_eq!(
            timeindex_text(&row).unwrap().unwrap(),
            "0.000000=>0,3600.000000=>4096,latest=>1"
        );
        assert_eq!(
            timeindex_hstore(&row).unwrap().unwrap(),
            "\"0.000000\"=>\"0\",\"3600.000000\"=>\"4096\",\"latest\"=>\"1\""
        );
    }

    #[test]
    fn null_timeindex_when_guard_fails() {
        let row = row_with(Vec::new(), None);
        assert_eq!(timeindex_text(&row).unwrap(), None);
    }

    #[test]
    fn timespans_formats() {
        let spans = vec![Span {
            start: 0,
            end: 89_990_000_000,
            sample_rate: 100.0,
        }];
        let row = row_with(spans, None);
        assert_eq!(
            timespans_text(&row).unwrap().unwrap(),
            "[0.000000:89.990000]"
        );
        assert_eq!(
            timespans_pg_array(&row).unwrap().unwrap(),
            "{\"[0.000000,89.990000]\"}"
        );
    }

    #[test]
    fn timerates_only_on_mismatch() {
        let spans = vec![
            Span {
                start: 0,
                end: 1,
                sample_rate: 100.0,
            },
            Span {
                start: 2,
                end: 3,
                sample_rate: 100.5,
            },
        ];
        let mut row = row_with(spans, None);
        assert_eq!(timerates_text(&row).unwrap(), None);
        row.rate_mismatch = true;
        assert_eq!(timerates_text(&row).unwrap().unwrap(), "100,100.5");
        assert_eq!(timerates_pg_array(&row).unwrap().unwrap(), "{100,100.5}");
    }

    #[test]
    fn rate_formatting_keeps_six_significant_digits() {
        assert_eq!(format_rate(100.0), "100");
        assert_eq!(format_rate(100.5), "100.5");
        assert_eq!(format_rate(0.016667), "0.016667");
        assert_eq!(format_rate(0.0), "0");
    }
}
