//! Index store backends.
//!
//! Reconciles a scanned file's sections against an existing index:
//! preserves `updated` timestamps for rows whose content digest has not
//! changed, then atomically replaces the file's row set in one
//! transaction. Two backends share the serialization rules: an embedded
//! SQLite file and a networked PostgreSQL server.

mod error;
mod ident;
mod postgres;
pub mod row;
mod sqlite;

pub use error::StoreError;
pub use postgres::{PostgresStore, PostgresStoreConfig};
pub use row::{build_rows, filename_filter, FilenameFilter, SectionRow};
pub use sqlite::{SqliteStore, SqliteStoreConfig};

use async_trait::async_trait;
use mseedidx_core::FileEntry;
use mseedidx_mseed::nstime::NS_PER_SEC;

/// Partition-pruning slack around the file's time extents.
pub(crate) const ONE_DAY_NS: i64 = 86_400 * NS_PER_SEC;

/// What one file's reconciliation did.
#[derive(Debug)]
pub struct SyncReport {
    /// The rows as inserted, preservation applied.
    pub rows: Vec<SectionRow>,
    /// Prior rows matched by the filename clause.
    pub matched: usize,
    /// Rows deleted inside the transaction.
    pub deleted: u64,
}

/// A configured index store.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Human-readable target for log lines.
    fn describe(&self) -> String;

    /// Reconcile one file's sections in a single transaction.
    async fn sync_file(&self, file: &FileEntry) -> Result<SyncReport, StoreError>;

    /// Release the connection.
    async fn close(&self);
}

/// Round nanoseconds to whole epoch seconds.
pub(crate) fn round_to_seconds(ns: i64) -> i64 {
    (ns + NS_PER_SEC / 2).div_euclid(NS_PER_SEC)
}
