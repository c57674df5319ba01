//! Synthetic miniSEED records for tests.
//!
//! Builders produce byte-exact records of both format generations so the
//! decoder, aggregator, and store tests can run without fixture files.

use chrono::{DateTime, Datelike, Timelike, Utc};

const NS_PER_SEC: i64 = 1_000_000_000;

/// Parameters for a miniSEED 3 record.
#[derive(Debug, Clone)]
pub struct V3RecordSpec {
    pub sid: String,
    pub start_ns: i64,
    pub sample_rate: f64,
    pub sample_count: u32,
    pub pub_version: u8,
    /// Payload is zero-filled; only its length matters to the indexer.
    pub payload_len: u32,
}

/// Encode a miniSEED 3 record (CRC field left zero).
pub fn v3_record(spec: &V3RecordSpec) -> Vec<u8> {
    let sid = spec.sid.as_bytes();
    assert!(sid.len() <= u8::MAX as usize, "SID too long");
    let (year, yday, hour, minute, second, nanos) = civil(spec.start_ns);

    let mut rec = Vec::with_capacity(40 + sid.len() + spec.payload_len as usize);
    rec.extend_from_slice(b"MS");
    rec.push(3);
    rec.push(0); // flags
    rec.extend_from_slice(&nanos.to_le_bytes());
    rec.extend_from_slice(&(year as u16).to_le_bytes());
    rec.extend_from_slice(&(yday as u16).to_le_bytes());
    rec.push(hour as u8);
    rec.push(minute as u8);
    rec.push(second as u8);
    rec.push(11); // encoding: Steim-2
    rec.extend_from_slice(&spec.sample_rate.to_le_bytes());
    rec.extend_from_slice(&spec.sample_count.to_le_bytes());
    rec.extend_from_slice(&0u32.to_le_bytes()); // CRC
    rec.push(spec.pub_version);
    rec.push(sid.len() as u8);
    rec.extend_from_slice(&0u16.to_le_bytes()); // extra header length
    rec.extend_from_slice(&spec.payload_len.to_le_bytes());
    rec.extend_from_slice(sid);
    rec.resize(rec.len() + spec.payload_len as usize, 0);
    rec
}

/// Parameters for a miniSEED 2 record.
#[derive(Debug, Clone)]
pub struct V2RecordSpec {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub quality: char,
    pub start_ns: i64,
    pub sample_count: u16,
    /// SEED rate factor; positive values are Hz.
    pub rate_factor: i16,
    pub rate_multiplier: i16,
    /// Total record length, a power of two >= 128.
    pub record_len: usize,
}

/// Encode a big-endian miniSEED 2 record with a Blockette 1000.
pub fn v2_record(spec: &V2RecordSpec) -> Vec<u8> {
    assert!(spec.record_len.is_power_of_two() && spec.record_len >= 128);
    let exp = spec.record_len.trailing_zeros() as u8;
    let (year, yday, hour, minute, second, nanos) = civil(spec.start_ns);

    let mut rec = vec![0u8; spec.record_len];
    rec[..6].copy_from_slice(b"000001");
    rec[6] = spec.quality as u8;
    rec[7] = b' ';
    pad(&mut rec[8..13], &spec.station);
    pad(&mut rec[13..15], &spec.location);
    pad(&mut rec[15..18], &spec.channel);
    pad(&mut rec[18..20], &spec.network);
    rec[20..22].copy_from_slice(&(year as u16).to_be_bytes());
    rec[22..24].copy_from_slice(&(yday as u16).to_be_bytes());
    rec[24] = hour as u8;
    rec[25] = minute as u8;
    rec[26] = second as u8;
    // BTIME fraction in 0.0001 s units.
    rec[28..30].copy_from_slice(&((nanos / 100_000) as u16).to_be_bytes());
    rec[30..32].copy_from_slice(&spec.sample_count.to_be_bytes());
    rec[32..34].copy_from_slice(&spec.rate_factor.to_be_bytes());
    rec[34..36].copy_from_slice(&spec.rate_multiplier.to_be_bytes());
    rec[39] = 1; // one blockette follows
    rec[44..46].copy_from_slice(&64u16.to_be_bytes()); // data offset
    rec[46..48].copy_from_slice(&48u16.to_be_bytes()); // first blockette

    // Blockette 1000 at offset 48.
    rec[48..50].copy_from_slice(&1000u16.to_be_bytes());
    rec[50..52].copy_from_slice(&0u16.to_be_bytes());
    rec[52] = 11; // encoding
    rec[53] = 1; // word order: big-endian
    rec[54] = exp;
    rec
}

fn pad(dest: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    assert!(bytes.len() <= dest.len(), "field '{value}' too long");
    dest.fill(b' ');
    dest[..bytes.len()].copy_from_slice(bytes);
}

fn civil(start_ns: i64) -> (i32, u32, u32, u32, u32, u32) {
    let secs = start_ns.div_euclid(NS_PER_SEC);
    let nanos = start_ns.rem_euclid(NS_PER_SEC) as u32;
    let dt: DateTime<Utc> = DateTime::from_timestamp(secs, nanos).expect("time in range");
    (
        dt.year(),
        dt.ordinal(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.nanosecond(),
    )
}
