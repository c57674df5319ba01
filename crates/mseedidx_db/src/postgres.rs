//! Networked PostgreSQL backend.
//!
//! The target table must already exist (schema documented in the
//! repository README). Times are bound as epoch seconds through
//! `to_timestamp`; hstore and array values are bound as text and cast in
//! the INSERT so nothing is spliced into SQL.

use crate::error::StoreError;
use crate::ident::validate_table;
use crate::row::{
    build_rows, filename_filter, timeindex_hstore, timerates_pg_array, timespans_pg_array,
    FilenameFilter,
};
use crate::{IndexStore, SyncReport, ONE_DAY_NS};
use async_trait::async_trait;
use mseedidx_core::FileEntry;
use mseedidx_mseed::nstime;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row as _;
use tracing::{debug, info};

/// PostgreSQL backend configuration.
#[derive(Debug, Clone)]
pub struct PostgresStoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub table: String,
    pub no_update: bool,
}

/// Network store over one connection.
pub struct PostgresStore {
    pool: PgPool,
    table: String,
    no_update: bool,
}

impl PostgresStore {
    /// Connect and pin the session time zone to UTC.
    pub async fn connect(config: PostgresStoreConfig) -> Result<Self, StoreError> {
        validate_table(&config.table)?;

        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .application_name("mseedidx");
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("SET SESSION timezone TO 'UTC'")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;

        info!(host = %config.host, database = %config.database, table = %config.table,
              "connected to PostgreSQL index");
        Ok(Self {
            pool,
            table: config.table,
            no_update: config.no_update,
        })
    }
}

fn filename_clause(filter: &FilenameFilter) -> (&'static str, &str) {
    match filter {
        FilenameFilter::Exact(value) => ("filename = $1", value),
        FilenameFilter::Prefix(pattern) => ("filename LIKE $1 ESCAPE '\\'", pattern),
    }
}

#[async_trait]
impl IndexStore for PostgresStore {
    fn describe(&self) -> String {
        format!("PostgreSQL table {}", self.table)
    }

    async fn sync_file(&self, file: &FileEntry) -> Result<SyncReport, StoreError> {
        let table = &self.table;
        let mut rows = build_rows(file)?;
        let filter = filename_filter(&file.path)?;
        let (clause, filename_bind) = filename_clause(&filter);

        let start_ceiling = nstime::to_epoch_seconds(file.latest + ONE_DAY_NS);
        let end_floor = nstime::to_epoch_seconds(file.earliest - ONE_DAY_NS);

        let mut tx = self.pool.begin().await?;
        let mut matched = 0usize;
        let mut deleted = 0u64;

        if !self.no_update {
            let select = format!(
                "SELECT network, station, location, channel, version, hash, \
                        extract(epoch from updated)::float8 \
                 FROM {table} \
                 WHERE {clause} AND starttime <= to_timestamp($2) AND endtime >= to_timestamp($3)"
            );
            let prior: Vec<PgRow> = sqlx::query(&select)
                .bind(filename_bind)
                .bind(start_ceiling)
                .bind(end_floor)
                .fetch_all(&mut *tx)
                .await?;
            matched = prior.len();
            debug!(path = %file.path, matched, "matched prior rows");

            for prior_row in &prior {
                let updated = prior_row.get::<f64, _>(6).round() as i64;
                for row in rows.iter_mut() {
                    if row.hash == prior_row.get::<String, _>(5)
                        && row.version == i64::from(prior_row.get::<i16, _>(4))
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
                "DELETE FROM {table} \
                 WHERE {clause} AND starttime <= to_timestamp($2) AND endtime >= to_timestamp($3)"
            );
            deleted = sqlx::query(&delete)
                .bind(filename_bind)
                .bind(start_ceiling)
                .bind(end_floor)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        let insert = format!(
            "INSERT INTO {table} \
             (network, station, location, channel, quality, version, \
              starttime, endtime, samplerate, filename, byteoffset, bytes, hash, \
              timeindex, timespans, timerates, format, filemodtime, updated, scanned) \
             VALUES ($1, $2, $3, $4, $5, $6, \
                     to_timestamp($7), to_timestamp($8), $9::float8::numeric, \
                     $10, $11, $12, $13, \
                     $14::hstore, $15::numrange[], $16::numeric[], $17, \
                     to_timestamp($18), to_timestamp($19), to_timestamp($20))"
        );
        for row in &rows {
            sqlx::query(&insert)
                .bind(&row.network)
                .bind(&row.station)
                .bind(&row.location)
                .bind(&row.channel)
                .bind(&row.quality)
                .bind(row.version as i16)
                .bind(nstime::to_epoch_seconds(micro_rounded(row.earliest)))
                .bind(nstime::to_epoch_seconds(micro_rounded(row.latest)))
                .bind(row.sample_rate)
                .bind(&file.path)
                .bind(row.byte_offset)
                .bind(row.bytes)
                .bind(&row.hash)
                .bind(timeindex_hstore(row)?)
                .bind(timespans_pg_array(row)?)
                .bind(timerates_pg_array(row)?)
                .bind(None::<String>)
                .bind(file.file_mod_time.map(|secs| secs as f64))
                .bind(row.updated as f64)
                .bind(file.scan_time as f64)
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

/// Round nanoseconds to whole microseconds before the epoch conversion.
fn micro_rounded(ns: i64) -> i64 {
    (ns + 500).div_euclid(1_000) * 1_000
}
