//! Embedded SQLite backend.
//!
//! Schema and indexes are created on first use. All time fields are ISO
//! text; comparisons stay lexicographic because every value uses the same
//! `YYYY-MM-DDTHH:MM:SS[.ffffff]` shape.

use crate::error::StoreError;
use crate::ident::validate_table;
use crate::row::{
    build_rows, filename_filter, timeindex_text, timerates_text, timespans_text, FilenameFilter,
};
use crate::{IndexStore, SyncReport, ONE_DAY_NS};
use async_trait::async_trait;
use mseedidx_core::FileEntry;
use mseedidx_mseed::nstime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row as _;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite backend configuration.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    pub path: PathBuf,
    pub table: String,
    /// Block-and-retry window for lock acquisition.
    pub busy_timeout: Duration,
    /// Skip the preservation query and the delete step.
    pub no_update: bool,
}

/// Embedded single-file store.
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
    no_update: bool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and ensure the schema.
    pub async fn open(config: SqliteStoreConfig) -> Result<Self, StoreError> {
        validate_table(&config.table)?;

        // Case-sensitive LIKE keeps the filename index usable for the
        // versioned-filename prefix search.
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout)
            .pragma("case_sensitive_like", "ON");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            table: config.table,
            no_update: config.no_update,
        };
        store.ensure_schema().await?;
        info!(path = %config.path.display(), table = %store.table, "opened SQLite index");
        Ok(store)
    }

    /// The underlying pool (escape hatch for verification queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let table = &self.table;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} \
             (network TEXT, station TEXT, location TEXT, channel TEXT, \
              quality TEXT, version INTEGER, \
              starttime TEXT, endtime TEXT, samplerate REAL, \
              filename TEXT, byteoffset INTEGER, bytes INTEGER, hash TEXT, \
              timeindex TEXT, timespans TEXT, timerates TEXT, format TEXT, \
              filemodtime TEXT, updated TEXT, scanned TEXT)"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_nslcse_idx ON {table} \
             (network, station, location, channel, starttime, endtime)"
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_filename_idx ON {table} (filename)"
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {table}_updated_idx ON {table} (updated)"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Filename clause SQL plus its bind value.
fn filename_clause(filter: &FilenameFilter) -> (&'static str, &str) {
    match filter {
        FilenameFilter::Exact(value) => ("filename = ?", value),
        FilenameFilter::Prefix(pattern) => ("filename LIKE ? ESCAPE '\\'", pattern),
    }
}

#[async_trait]
impl IndexStore for SqliteStore {
    fn describe(&self) -> String {
        format!("SQLite table {}", self.table)
    }

    async fn sync_file(&self, file: &FileEntry) -> Result<SyncReport, StoreError> {
        let table = &self.table;
        let mut rows = build_rows(file)?;
        let filter = filename_filter(&file.path)?;
        let (clause, filename_bind) = filename_clause(&filter);

        // Narrow the search by the file's extents so the store can prune.
        let start_ceiling = nstime::iso_micro(file.latest + ONE_DAY_NS);
        let end_floor = nstime::iso_micro(file.earliest - ONE_DAY_NS);

        let mut tx = self.pool.begin().await?;
        let mut matched = 0usize;
        let mut deleted = 0u64;

        if !self.no_update {
            let select = format!(
                "SELECT network, station, location, channel, version, hash, updated \
                 FROM {table} WHERE {clause} AND starttime <= ? AND endtime >= ?"
            );
            let prior: Vec<SqliteRow> = sqlx::query(&select)
                .bind(filename_bind)
                .bind(&start_ceiling)
                .bind(&end_floor)
                .fetch_all(&mut *tx)
                .await?;
            matched = prior.len();
            debug!(path = %file.path, matched, "matched prior rows");

            // Carry the previous `updated` forward when content has not
            // changed. Later matches overwrite earlier ones.
            for prior_row in &prior {
                let updated: String = prior_row.get(6);
                let Some(updated) = nstime::parse_iso(&updated).map(crate::round_to_seconds)
                else {
                    continue;
                };
                for row in rows.iter_mut() {
                    if row.hash == prior_row.get::<String, _>(5)
                        && row.version == prior_row.get::<i64, _>(4)
                        && row.channel == prior_row.get::<String, _>(3)
                        && row.location == prior_row.get::<String, _>(2)
                        && row.station == prior_row.get::<String, _>(1)
                        && row.network == prior_row.get::<String, _>(0)
                    {
                        row.updated = updated;
                    }
                }
            }

            let delete = format!(
                "DELETE FROM {table} WHERE {clause} AND starttime <= ? AND endtime >= ?"
            );
            deleted = sqlx::query(&delete)
                .bind(filename_bind)
                .bind(&start_ceiling)
                .bind(&end_floor)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        let insert = format!(
            "INSERT INTO {table} \
             (network, station, location, channel, quality, version, \
              starttime, endtime, samplerate, filename, byteoffset, bytes, hash, \
              timeindex, timespans, timerates, format, filemodtime, updated, scanned) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        for row in &rows {
            sqlx::query(&insert)
                .bind(&row.network)
                .bind(&row.station)
                .bind(&row.location)
                .bind(&row.channel)
                .bind(&row.quality)
                .bind(row.version)
                .bind(nstime::iso_micro(row.earliest))
                .bind(nstime::iso_micro(row.latest))
                .bind(row.sample_rate)
                .bind(&file.path)
                .bind(row.byte_offset)
                .bind(row.bytes)
                .bind(&row.hash)
                .bind(timeindex_text(row)?)
                .bind(timespans_text(row)?)
                .bind(timerates_text(row)?)
                .bind(None::<String>)
                .bind(file.file_mod_time.map(nstime::iso_seconds))
                .bind(nstime::iso_seconds(row.updated))
                .bind(nstime::iso_seconds(file.scan_time))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(SyncReport {
            rows,
            matched,
            deleted,
        })
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
