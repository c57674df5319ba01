//! miniSEED record decoding for the index engine.
//!
//! This crate is the decoder boundary: it turns a byte stream (local file,
//! standard input, or an HTTP response body) into a sequence of decoded
//! record headers with their absolute byte positions. Only headers are
//! decoded — sample payloads are carried as opaque bytes for hashing.
//!
//! Both record generations are understood:
//!
//! - miniSEED 2: 48-byte fixed header (either byte order) plus a blockette
//!   chain; the record length comes from Blockette 1000.
//! - miniSEED 3: `MS` + version 3, 40-byte little-endian fixed header with
//!   explicit SID and payload lengths.

mod error;
mod leapsecond;
mod reader;
mod record;
mod sid;
mod v2;
mod v3;

pub mod nstime;

pub use error::DecodeError;
pub use leapsecond::{LeapSeconds, LEAPSECOND_ENV};
pub use reader::{Input, ReaderConfig, RecordReader};
pub use record::RawRecord;
pub use sid::{nslc_to_sid, parse_sid, Nslc, SidError};
