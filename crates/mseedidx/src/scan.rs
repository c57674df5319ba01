//! Scan phase: one input in, one file entry out.

use crate::Cli;
use anyhow::{Context, Result};
use mseedidx_core::{index_stream, FileEntry};
use mseedidx_mseed::{Input, LeapSeconds, ReaderConfig};
use tracing::info;

/// Open an input, stream its records, and aggregate sections.
///
/// Any decode or integrity failure is fatal; the reconciler never sees a
/// partially scanned file. The read handle is released on return.
pub fn scan_input(spec: &str, cli: &Cli, leap: &LeapSeconds) -> Result<FileEntry> {
    info!(input = spec, "processing");

    let input = Input::open(spec).with_context(|| format!("cannot open {spec}"))?;
    let mod_time = input.mod_time;
    let scan_time = chrono::Utc::now().timestamp();

    let mut reader = input.into_reader(
        ReaderConfig {
            skip_non_data: cli.skip_non_data,
        },
        leap.clone(),
    );

    let tolerances = cli.tolerances();
    let file = index_stream(
        &mut reader,
        spec,
        mod_time,
        scan_time,
        cli.aggregate_config(),
        &tolerances,
    )?;

    if reader.skipped_bytes() > 0 {
        info!(
            input = spec,
            skipped = reader.skipped_bytes(),
            "skipped non-miniSEED bytes"
        );
    }
    info!(input = spec, sections = file.sections.len(), "scan complete");
    Ok(file)
}
