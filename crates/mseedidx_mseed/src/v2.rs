//! miniSEED 2 fixed header and blockette chain decoding.

use crate::leapsecond::LeapSeconds;
use crate::nstime::{from_yday, NsTime};
use crate::reader::{Probe, ProbedHeader};
use crate::sid::nslc_to_sid;
use crate::DecodeError;

/// Fixed section of a v2 data header.
const HEADER_LEN: usize = 48;
/// Blockette 1000 body length (type + next + 4 fields).
const B1000_LEN: usize = 8;
/// Longest blockette chain we are willing to walk.
const MAX_BLOCKETTES: usize = 64;

/// Activity flag bit: the time correction has already been applied.
const ACT_TIME_CORRECTED: u8 = 0x02;

#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn u16(self, buf: &[u8], at: usize) -> u16 {
        let pair = [buf[at], buf[at + 1]];
        match self {
            ByteOrder::Big => u16::from_be_bytes(pair),
            ByteOrder::Little => u16::from_le_bytes(pair),
        }
    }

    fn i16(self, buf: &[u8], at: usize) -> i16 {
        self.u16(buf, at) as i16
    }

    fn i32(self, buf: &[u8], at: usize) -> i32 {
        let quad = [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]];
        match self {
            ByteOrder::Big => i32::from_be_bytes(quad),
            ByteOrder::Little => i32::from_le_bytes(quad),
        }
    }
}

/// Try to decode a v2 record header at the start of `buf`.
pub(crate) fn probe(
    buf: &[u8],
    offset: u64,
    leap: &LeapSeconds,
) -> Result<Probe, DecodeError> {
    if buf.len() < HEADER_LEN {
        return Ok(Probe::Need(HEADER_LEN));
    }

    if !buf[..6].iter().all(|b| b.is_ascii_digit() || *b == b' ') {
        return Ok(Probe::NoMatch);
    }
    let quality = buf[6];
    if !matches!(quality, b'D' | b'R' | b'Q' | b'M') {
        return Ok(Probe::NoMatch);
    }

    let order = match detect_order(buf) {
        Some(order) => order,
        None => return Ok(Probe::NoMatch),
    };

    let mut blockette_at = order.u16(buf, 46) as usize;
    let mut record_exp = None;
    for _ in 0..MAX_BLOCKETTES {
        if blockette_at == 0 {
            break;
        }
        if buf.len() < blockette_at + 4 {
            return Ok(Probe::Need(blockette_at + 4));
        }
        let blockette_type = order.u16(buf, blockette_at);
        let next = order.u16(buf, blockette_at + 2) as usize;
        if blockette_type == 1000 {
            if buf.len() < blockette_at + B1000_LEN {
                return Ok(Probe::Need(blockette_at + B1000_LEN));
            }
            record_exp = Some(buf[blockette_at + 6]);
            break;
        }
        if next <= blockette_at {
            break;
        }
        blockette_at = next;
    }

    let record_exp = match record_exp {
        Some(exp) if (7..=24).contains(&exp) => exp,
        Some(exp) => {
            return Err(DecodeError::BadHeader {
                offset,
                reason: format!("Blockette 1000 record length 2^{exp} out of range"),
            })
        }
        None => return Err(DecodeError::MissingBlockette1000 { offset }),
    };
    let length = 1usize << record_exp;

    let start_time = match start_time(buf, order, leap) {
        Some(ns) => ns,
        None => return Ok(Probe::NoMatch),
    };

    let station = field(&buf[8..13]);
    let location = field(&buf[13..15]);
    let channel = field(&buf[15..18]);
    let network = field(&buf[18..20]);

    Ok(Probe::Header(ProbedHeader {
        length,
        source_id: nslc_to_sid(&network, &station, &location, &channel),
        pub_version: pub_version(quality),
        quality: Some(quality as char),
        format_version: 2,
        start_time,
        sample_count: i64::from(order.u16(buf, 30)),
        sample_rate: nominal_rate(order.i16(buf, 32), order.i16(buf, 34)),
    }))
}

fn detect_order(buf: &[u8]) -> Option<ByteOrder> {
    for order in [ByteOrder::Big, ByteOrder::Little] {
        let year = order.u16(buf, 20);
        let yday = order.u16(buf, 22);
        if (1900..=2100).contains(&year)
            && (1..=366).contains(&yday)
            && buf[24] < 24
            && buf[25] < 60
            && buf[26] <= 60
        {
            return Some(order);
        }
    }
    None
}

fn start_time(buf: &[u8], order: ByteOrder, leap: &LeapSeconds) -> Option<NsTime> {
    let second = u32::from(buf[26]);
    // BTIME fraction is in units of 0.0001 seconds.
    let nanos = u32::from(order.u16(buf, 28)) * 100_000;
    let mut ns = from_yday(
        i32::from(order.u16(buf, 20)),
        u32::from(order.u16(buf, 22)),
        u32::from(buf[24]),
        u32::from(buf[25]),
        second,
        nanos,
    )?;
    if second == 60 {
        ns = leap.adjust_second_sixty(ns);
    }
    // Time correction field, 0.0001 s units, unless already applied.
    if buf[36] & ACT_TIME_CORRECTED == 0 {
        ns += i64::from(order.i32(buf, 40)) * 100_000;
    }
    Some(ns)
}

fn field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// SEED sample rate from factor and multiplier.
fn nominal_rate(factor: i16, multiplier: i16) -> f64 {
    let mut rate = match factor {
        0 => return 0.0,
        f if f > 0 => f64::from(f),
        f => -1.0 / f64::from(f),
    };
    match multiplier {
        0 => {}
        m if m > 0 => rate *= f64::from(m),
        m => rate /= -f64::from(m),
    }
    rate
}

/// Publication version from the legacy quality hierarchy.
fn pub_version(quality: u8) -> u8 {
    match quality {
        b'R' => 1,
        b'D' => 2,
        b'Q' => 3,
        b'M' => 4,
        _ => 1,
    }
}
