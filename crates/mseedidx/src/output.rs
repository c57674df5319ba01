//! Verbose row echo, in the traditional pipe-delimited form.

use anyhow::Result;
use mseedidx_core::FileEntry;
use mseedidx_db::row::{timeindex_text, timerates_text, timespans_text};
use mseedidx_db::SectionRow;
use mseedidx_mseed::nstime;

/// Print one line per row plus its serialized index columns.
pub fn echo_rows(file: &FileEntry, rows: &[SectionRow]) -> Result<()> {
    for row in rows {
        println!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            row.network,
            row.station,
            row.location,
            row.channel,
            row.quality,
            nstime::epoch_micro_string(row.earliest),
            nstime::epoch_micro_string(row.latest),
            row.sample_rate,
            file.path,
            row.byte_offset,
            row.bytes,
            row.hash,
            row.updated,
            file.scan_time,
        );
        println!(" TINDEX: '{}'", timeindex_text(row)?.unwrap_or_default());
        println!(" TSPANS: '{}'", timespans_text(row)?.unwrap_or_default());
        println!(" TRATES: '{}'", timerates_text(row)?.unwrap_or_default());
    }
    Ok(())
}
