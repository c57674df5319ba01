//! FDSN source identifier codec.
//!
//! Identifiers look like `FDSN:NET_STA_LOC_B_S_P` where a three-character
//! SEED channel code is split into band, source, and position. The index
//! store decomposes identifiers back into network, station, location, and
//! channel columns.

use thiserror::Error;

/// Decomposed source identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nslc {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

/// A source identifier that cannot be decomposed.
#[derive(Debug, Error)]
#[error("cannot parse source identifier '{0}'")]
pub struct SidError(pub String);

/// Build an FDSN SID from SEED codes.
pub fn nslc_to_sid(network: &str, station: &str, location: &str, channel: &str) -> String {
    let channel = if channel.len() == 3 && !channel.contains('_') {
        let mut split = String::with_capacity(5);
        for (i, ch) in channel.chars().enumerate() {
            if i > 0 {
                split.push('_');
            }
            split.push(ch);
        }
        split
    } else {
        channel.to_string()
    };
    format!("FDSN:{network}_{station}_{location}_{channel}")
}

/// Decompose a SID into SEED codes.
///
/// Accepts both split (`B_H_Z`) and plain channel forms; the `FDSN:`
/// namespace prefix is optional.
pub fn parse_sid(sid: &str) -> Result<Nslc, SidError> {
    let body = sid
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(sid);
    let fields: Vec<&str> = body.split('_').collect();
    let (network, station, location, channel) = match fields.as_slice() {
        [net, sta, loc, band, source, position] => (
            net.to_string(),
            sta.to_string(),
            loc.to_string(),
            format!("{band}{source}{position}"),
        ),
        [net, sta, loc, chan] => (
            net.to_string(),
            sta.to_string(),
            loc.to_string(),
            chan.to_string(),
        ),
        _ => return Err(SidError(sid.to_string())),
    };
    if network.is_empty() || station.is_empty() || channel.is_empty() {
        return Err(SidError(sid.to_string()));
    }
    Ok(Nslc {
        network,
        station,
        location,
        channel,
    })
}
