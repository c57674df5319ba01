//! Section state and span coalescing.

use mseedidx_mseed::nstime::{NsTime, NS_PER_SEC};

/// One `(time, byte_offset)` seek point inside a section.
///
/// Entries are appended only when a record's end time crosses the next
/// sub-index threshold, so offsets are strictly increasing and times are
/// non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIndexEntry {
    pub time: NsTime,
    pub byte_offset: u64,
}

/// A maximal run of records whose sample coverage is continuous under the
/// configured tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub start: NsTime,
    pub end: NsTime,
    pub sample_rate: f64,
}

/// A maximal byte-contiguous run of records with one source identifier and
/// publication version.
#[derive(Debug, Clone)]
pub struct Section {
    pub source_id: String,
    pub pub_version: u8,
    /// Legacy data quality byte from the first record, v2 input only.
    pub quality: Option<char>,
    /// Byte-inclusive extents within the file.
    pub start_offset: u64,
    pub end_offset: u64,
    /// Minimum record start and maximum record end seen.
    pub earliest: NsTime,
    pub latest: NsTime,
    /// First record's format generation; zeroed when records disagree.
    pub format_version: u8,
    /// First record's nominal sample rate.
    pub sample_rate: f64,
    /// Set when any record's rate departs from the nominal rate.
    pub rate_mismatch: bool,
    /// True while record start times never decreased.
    pub time_order: bool,
    /// Epoch seconds; seeded with the file modification time, possibly
    /// replaced by a prior row's value during reconciliation.
    pub updated_at: i64,
    pub time_index: Vec<TimeIndexEntry>,
    pub spans: Vec<Span>,
    /// Final MD5 digest, 32 lowercase hex characters.
    pub md5: String,
}

impl Section {
    /// Total bytes covered by the section's records.
    pub fn byte_count(&self) -> u64 {
        self.end_offset - self.start_offset + 1
    }

    /// The seek index represents the whole section only when the first
    /// entry is the time-earliest record; otherwise consumers must treat
    /// it as absent.
    pub fn time_index_valid(&self) -> bool {
        self.time_index
            .first()
            .is_some_and(|entry| entry.time == self.earliest)
    }
}

fn period_ns(rate: f64) -> i64 {
    (NS_PER_SEC as f64 / rate).round() as i64
}

/// Merge one record's coverage into an ordered span list.
///
/// The record may extend a span at either end, be absorbed when already
/// covered, or open a new span; touching neighbors are coalesced.
pub(crate) fn merge_into_spans(
    spans: &mut Vec<Span>,
    start: NsTime,
    end: NsTime,
    rate: f64,
    time_tol_ns: i64,
    rate_tol: Option<f64>,
    rate_match: impl Fn(f64, f64, Option<f64>) -> bool,
) {
    for i in 0..spans.len() {
        let span = spans[i];
        if !rate_match(span.sample_rate, rate, rate_tol) {
            continue;
        }
        if start >= span.start && end <= span.end {
            return;
        }
        let predicted_next = span.end + period_ns(span.sample_rate);
        if (start - predicted_next).abs() <= time_tol_ns {
            spans[i].end = span.end.max(end);
            coalesce_forward(spans, i, time_tol_ns, rate_tol, &rate_match);
            return;
        }
        let predicted_prev = span.start - period_ns(span.sample_rate);
        if (end - predicted_prev).abs() <= time_tol_ns {
            spans[i].start = span.start.min(start);
            coalesce_backward(spans, i, time_tol_ns, rate_tol, &rate_match);
            return;
        }
    }

    let at = spans
        .iter()
        .position(|span| span.start > start)
        .unwrap_or(spans.len());
    spans.insert(
        at,
        Span {
            start,
            end,
            sample_rate: rate,
        },
    );
}

fn coalesce_forward(
    spans: &mut Vec<Span>,
    i: usize,
    time_tol_ns: i64,
    rate_tol: Option<f64>,
    rate_match: &impl Fn(f64, f64, Option<f64>) -> bool,
) {
    while i + 1 < spans.len() {
        let (a, b) = (spans[i], spans[i + 1]);
        let joined = rate_match(a.sample_rate, b.sample_rate, rate_tol)
            && (b.start - (a.end + period_ns(a.sample_rate))).abs() <= time_tol_ns;
        if !joined {
            break;
        }
        spans[i].end = a.end.max(b.end);
        spans.remove(i + 1);
    }
}

fn coalesce_backward(
    spans: &mut Vec<Span>,
    i: usize,
    time_tol_ns: i64,
    rate_tol: Option<f64>,
    rate_match: &impl Fn(f64, f64, Option<f64>) -> bool,
) {
    if i == 0 {
        return;
    }
    let (a, b) = (spans[i - 1], spans[i]);
    let joined = rate_match(a.sample_rate, b.sample_rate, rate_tol)
        && (b.start - (a.end + period_ns(a.sample_rate))).abs() <= time_tol_ns;
    if joined {
        spans[i - 1].end = a.end.max(b.end);
        spans.remove(i);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tolerance::rate_within;

    const NS: i64 = NS_PER_SEC;

    fn merge(spans: &mut Vec<Span>, start_s: f64, end_s: f64, rate: f64) {
        let tol = (0.5 / rate * NS as f64) as i64;
        merge_into_spans(
            spans,
            (start_s * NS as f64) as i64,
            (end_s * NS as f64) as i64,
            rate,
            tol,
            None,
            rate_within,
        );
    }

    #[test]
    fn contiguous_records_form_one_span() {
        let mut spans = Vec::new();
        merge(&mut spans, 0.0, 29.99, 100.0);
        merge(&mut spans, 30.0, 59.99, 100.0);
        merge(&mut spans, 60.0, 89.99, 100.0);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, (89.99 * NS as f64) as i64);
    }

    #[test]
    fn a_gap_opens_a_new_span() {
        let mut spans = Vec::new();
        merge(&mut spans, 0.0, 29.99, 100.0);
        merge(&mut spans, 90.0, 119.99, 100.0);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn out_of_order_record_fills_a_gap() {
        let mut spans = Vec::new();
        merge(&mut spans, 0.0, 29.99, 100.0);
        merge(&mut spans, 60.0, 89.99, 100.0);
        // The missing middle arrives late and bridges both spans.
        merge(&mut spans, 30.0, 59.99, 100.0);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
    }

    #[test]
    fn rate_change_splits_spans() {
        let mut spans = Vec::new();
        merge(&mut spans, 0.0, 29.99, 100.0);
        merge(&mut spans, 30.0, 59.98, 100.5);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].sample_rate, 100.0);
        assert_eq!(spans[1].sample_rate, 100.5);
    }

    #[test]
    fn spans_stay_ordered_by_start() {
        let mut spans = Vec::new();
        merge(&mut spans, 120.0, 149.99, 100.0);
        merge(&mut spans, 0.0, 29.99, 100.0);
        merge(&mut spans, 60.0, 89.99, 100.0);
        let starts: Vec<_> = spans.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
        assert_eq!(spans.len(), 3);
    }

    #[test]
    fn covered_record_is_absorbed() {
        let mut spans = Vec::new();
        merge(&mut spans, 0.0, 59.99, 100.0);
        merge(&mut spans, 10.0, 19.99, 100.0);
        assert_eq!(spans.len(), 1);
    }
}
