//! mseedidx — synchronize miniSEED file summaries with an index database.
//!
//! Scans miniSEED files, groups byte-contiguous records into sections, and
//! reconciles one row per section into a PostgreSQL or SQLite index. A JSON
//! summary document can be written alongside or instead of a store.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use mseedidx_core::{AggregateConfig, FileEntry, FixedTolerances};
use mseedidx_mseed::LeapSeconds;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod inputs;
mod json_out;
mod output;
mod scan;
mod sync;

#[derive(Parser, Debug)]
#[command(
    name = "mseedidx",
    version,
    about = "Synchronize miniSEED file summaries with an index database",
    after_help = "Inputs are miniSEED files, '-' for standard input, HTTP(S) URLs, \
                  or '@file' naming a list of inputs (one per line, '#' comments)."
)]
struct Cli {
    /// Be more verbose; repeat for more detail
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Silently skip bytes that are not recognizable miniSEED records
    #[arg(long)]
    skip_non_data: bool,

    /// Parse and report only; do not connect to any store
    #[arg(short = 'n', long)]
    no_sync: bool,

    /// Insert without searching for or replacing prior rows (bulk loads)
    #[arg(long)]
    no_update: bool,

    /// Keep input paths as given instead of resolving absolute paths
    #[arg(long)]
    keep_path: bool,

    /// Time tolerance for span continuity, in seconds
    #[arg(long, value_name = "SECONDS")]
    time_tolerance: Option<f64>,

    /// Absolute sample rate tolerance for span continuity, in Hz
    #[arg(long, value_name = "DIFF")]
    rate_tolerance: Option<f64>,

    /// Interval between time index entries within a section, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 3600)]
    sub_index: u32,

    /// Index table name
    #[arg(long, default_value = "tsindex")]
    table: String,

    /// PostgreSQL host; selects the PostgreSQL backend
    #[arg(long, value_name = "HOST")]
    pg_host: Option<String>,

    /// PostgreSQL port
    #[arg(long, value_name = "PORT", default_value_t = 5432)]
    pg_port: u16,

    /// Database name
    #[arg(long, value_name = "NAME", default_value = "timeseries")]
    db_name: String,

    /// Database user
    #[arg(long, value_name = "USER", default_value = "timeseries")]
    db_user: String,

    /// Database password
    #[arg(long, value_name = "PASS")]
    db_pass: Option<String>,

    /// SQLite database file; selects the embedded backend
    #[arg(long, value_name = "FILE")]
    sqlite: Option<PathBuf>,

    /// SQLite busy timeout in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 10_000)]
    busy_timeout: u64,

    /// Write a JSON summary document ('-' for standard output)
    #[arg(long, value_name = "PATH")]
    json: Option<String>,

    /// Input files, '-', URLs, or '@list' files
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<String>,
}

impl Cli {
    fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            sub_index_interval_secs: self.sub_index,
        }
    }

    fn tolerances(&self) -> FixedTolerances {
        FixedTolerances {
            time: self.time_tolerance,
            rate: self.rate_tolerance,
        }
    }

    /// Echo rows when asked twice, or once with nothing else to do.
    fn echo_rows(&self) -> bool {
        self.verbose >= 2 || (self.verbose >= 1 && self.no_sync)
    }
}

fn main() -> ExitCode {
    // Argument errors exit 1 like every other fatal error; help and
    // version requests stay successful.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    // -vv also surfaces the store drivers' statement logging.
    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "mseedidx=info,mseedidx_core=info,mseedidx_db=info,mseedidx_mseed=info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if !cli.no_sync && cli.sqlite.is_none() && cli.pg_host.is_none() && cli.json.is_none() {
        bail!("no store was specified; use --sqlite, --pg-host, --json, or --no-sync");
    }
    if cli.sub_index == 0 {
        bail!("--sub-index must be positive");
    }

    let specs = inputs::expand(&cli.inputs)?;
    let specs = if cli.keep_path {
        specs
    } else {
        inputs::resolve_paths(specs)?
    };

    let leap = LeapSeconds::from_env();
    let mut files: Vec<FileEntry> = Vec::with_capacity(specs.len());
    for spec in &specs {
        files.push(scan::scan_input(spec, &cli, &leap)?);
    }

    if let Some(json_path) = &cli.json {
        json_out::write(json_path, &files)
            .with_context(|| format!("writing JSON summary to {json_path}"))?;
    }

    if cli.no_sync {
        if cli.echo_rows() {
            for file in &files {
                let rows = mseedidx_db::build_rows(file)?;
                output::echo_rows(file, &rows)?;
            }
        }
        return Ok(());
    }

    if cli.sqlite.is_some() || cli.pg_host.is_some() {
        sync::run(&cli, &files)?;
    }
    Ok(())
}
