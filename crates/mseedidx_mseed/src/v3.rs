//! miniSEED 3 fixed header decoding.
//!
//! The v3 header is little-endian and self-describing:
//!
//! ```text
//! [0..2]  "MS"            [16..24] sample rate/period (f64)
//! [2]     format version  [24..28] sample count (u32)
//! [3]     flags           [28..32] CRC-32C (carried, not validated)
//! [4..8]  nanosecond      [32]     publication version
//! [8..10] year            [33]     SID length
//! [10..12] day of year    [34..36] extra header length (u16)
//! [12..15] hour/min/sec   [36..40] payload length (u32)
//! [15]    encoding        [40..]   SID, extra headers, payload
//! ```

use crate::leapsecond::LeapSeconds;
use crate::nstime::from_yday;
use crate::reader::{Probe, ProbedHeader};

const FIXED_LEN: usize = 40;
/// Upper bound on a plausible record; anything larger is treated as noise.
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Try to decode a v3 record header at the start of `buf`.
pub(crate) fn probe(buf: &[u8], leap: &LeapSeconds) -> Probe {
    if buf.len() < FIXED_LEN {
        return Probe::Need(FIXED_LEN);
    }
    if &buf[..2] != b"MS" || buf[2] != 3 {
        return Probe::NoMatch;
    }

    let nanosecond = u32_at(buf, 4);
    let year = u16_at(buf, 8);
    let yday = u16_at(buf, 10);
    let (hour, minute, second) = (buf[12], buf[13], buf[14]);
    if nanosecond >= 1_000_000_000
        || !(1800..=2500).contains(&year)
        || !(1..=366).contains(&yday)
        || hour >= 24
        || minute >= 60
        || second > 60
    {
        return Probe::NoMatch;
    }

    let sid_len = buf[33] as usize;
    let extra_len = u16_at(buf, 34) as usize;
    let payload_len = u32_at(buf, 36) as usize;
    let length = FIXED_LEN + sid_len + extra_len + payload_len;
    if sid_len == 0 || length > MAX_RECORD_LEN {
        return Probe::NoMatch;
    }
    if buf.len() < FIXED_LEN + sid_len {
        return Probe::Need(FIXED_LEN + sid_len);
    }
    let source_id = match std::str::from_utf8(&buf[FIXED_LEN..FIXED_LEN + sid_len]) {
        Ok(sid) => sid.trim_end_matches('\0').to_string(),
        Err(_) => return Probe::NoMatch,
    };

    // A negative value encodes a sample period in seconds.
    let rate_field = f64::from_le_bytes(buf[16..24].try_into().expect("8 bytes"));
    let sample_rate = if !rate_field.is_finite() {
        return Probe::NoMatch;
    } else if rate_field < 0.0 {
        -1.0 / rate_field
    } else {
        rate_field
    };

    let mut start_time = match from_yday(
        i32::from(year),
        u32::from(yday),
        u32::from(hour),
        u32::from(minute),
        u32::from(second),
        nanosecond,
    ) {
        Some(ns) => ns,
        None => return Probe::NoMatch,
    };
    if second == 60 {
        start_time = leap.adjust_second_sixty(start_time);
    }

    Probe::Header(ProbedHeader {
        length,
        source_id,
        pub_version: buf[32],
        quality: None,
        format_version: 3,
        start_time,
        sample_count: i64::from(u32_at(buf, 24)),
        sample_rate,
    })
}
