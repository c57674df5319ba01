//! JSON summary sink.

use anyhow::Result;
use mseedidx_core::{FileEntry, FileSummary};
use std::fs::File;
use std::io::Write;

/// Write one document describing all scanned files.
///
/// The path `-` means standard output.
pub fn write(path: &str, files: &[FileEntry]) -> Result<()> {
    let summaries: Vec<FileSummary> = files.iter().map(FileSummary::from).collect();
    if path == "-" {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, &summaries)?;
        writeln!(out)?;
    } else {
        let mut out = File::create(path)?;
        serde_json::to_writer_pretty(&mut out, &summaries)?;
        writeln!(out)?;
    }
    Ok(())
}
