//! Reconciliation against the embedded SQLite backend.

use mseedidx_core::{index_stream, AggregateConfig, FileEntry, FixedTolerances};
use mseedidx_db::{IndexStore, SqliteStore, SqliteStoreConfig};
use mseedidx_mseed::{LeapSeconds, ReaderConfig, RecordReader};
use mseedidx_testutil::{v3_record, V3RecordSpec};
use sqlx::Row as _;
use std::time::Duration;
use tempfile::TempDir;

const NS: i64 = 1_000_000_000;
const SID: &str = "FDSN:XX_TEST__B_H_Z";

fn record(start_s: i64, pub_version: u8) -> Vec<u8> {
    v3_record(&V3RecordSpec {
        sid: SID.to_string(),
        start_ns: start_s * NS,
        sample_rate: 100.0,
        sample_count: 3000,
        pub_version,
        payload_len: (512 - 40 - SID.len()) as u32,
    })
}

fn scan_bytes(path: &str, bytes: Vec<u8>, mod_time: i64, scan_time: i64) -> FileEntry {
    let mut reader = RecordReader::new(
        std::io::Cursor::new(bytes),
        ReaderConfig::default(),
        LeapSeconds::none(),
    );
    index_stream(
        &mut reader,
        path,
        Some(mod_time),
        scan_time,
        AggregateConfig::default(),
        &FixedTolerances::default(),
    )
    .unwrap()
}

/// Three adjacent records starting at `base_s`: one section.
fn one_section_file(path: &str, base_s: i64, mod_time: i64, scan_time: i64) -> FileEntry {
    let mut bytes = record(base_s, 1);
    bytes.extend(record(base_s + 30, 1));
    bytes.extend(record(base_s + 60, 1));
    scan_bytes(path, bytes, mod_time, scan_time)
}

async fn open_store(dir: &TempDir, no_update: bool) -> SqliteStore {
    SqliteStore::open(SqliteStoreConfig {
        path: dir.path().join("tsindex.sqlite"),
        table: "tsindex".to_string(),
        busy_timeout: Duration::from_millis(10_000),
        no_update,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn schema_and_indexes_created_on_open() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    let names: Vec<String> =
        sqlx::query("SELECT name FROM sqlite_master WHERE type IN ('table','index') ORDER BY name")
            .fetch_all(store.pool())
            .await
            .unwrap()
            .iter()
            .map(|row| row.get(0))
            .collect();
    assert!(names.contains(&"tsindex".to_string()));
    assert!(names.contains(&"tsindex_nslcse_idx".to_string()));
    assert!(names.contains(&"tsindex_filename_idx".to_string()));
    assert!(names.contains(&"tsindex_updated_idx".to_string()));
    store.close().await;
}

#[tokio::test]
async fn first_sync_inserts_rows_with_modtime_updated() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;
    let file = one_section_file("/data/a.mseed", 0, 1_000, 2_000);

    let report = store.sync_file(&file).await.unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.matched, 0);
    assert_eq!(report.deleted, 0);

    let row = sqlx::query(
        "SELECT network, station, channel, version, byteoffset, bytes, \
                timeindex, timespans, timerates, format, updated, scanned FROM tsindex",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>(0), "XX");
    assert_eq!(row.get::<String, _>(1), "TEST");
    assert_eq!(row.get::<String, _>(2), "BHZ");
    assert_eq!(row.get::<i64, _>(3), 1);
    assert_eq!(row.get::<i64, _>(4), 0);
    assert_eq!(row.get::<i64, _>(5), 1536);
    assert_eq!(row.get::<String, _>(6), "0.000000=>0,latest=>1");
    assert_eq!(row.get::<String, _>(7), "[0.000000:89.990000]");
    assert_eq!(row.get::<Option<String>, _>(8), None); // no rate mismatch
    assert_eq!(row.get::<Option<String>, _>(9), None); // format reserved
    assert_eq!(row.get::<String, _>(10), "1970-01-01T00:16:40"); // mod time
    assert_eq!(row.get::<String, _>(11), "1970-01-01T00:33:20"); // scan time
    store.close().await;
}

#[tokio::test]
async fn idempotent_rescan_preserves_updated_and_advances_scanned() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    store
        .sync_file(&one_section_file("/data/a.mseed", 0, 1_000, 2_000))
        .await
        .unwrap();

    // Same bytes, later scan: updated must survive, scanned must advance.
    let report = store
        .sync_file(&one_section_file("/data/a.mseed", 0, 1_000, 3_000))
        .await
        .unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].updated, 1_000);

    let rows = sqlx::query("SELECT updated, scanned FROM tsindex")
        .fetch_all(store.pool())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<String, _>(0), "1970-01-01T00:16:40");
    assert_eq!(rows[0].get::<String, _>(1), "1970-01-01T00:50:00");
    store.close().await;
}

#[tokio::test]
async fn changed_content_takes_new_modtime() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    store
        .sync_file(&one_section_file("/data/a.mseed", 0, 1_000, 2_000))
        .await
        .unwrap();

    // Different record content: the digest differs, preservation skips.
    let mut bytes = record(0, 1);
    bytes.extend(record(30, 1));
    let changed = scan_bytes("/data/a.mseed", bytes, 1_500, 3_000);
    let report = store.sync_file(&changed).await.unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.rows[0].updated, 1_500);
    store.close().await;
}

#[tokio::test]
async fn versioned_scan_replaces_prior_version_rows() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    // Version 1 indexed twice: once near epoch, once ten days later.
    // Only the overlapping rows may be replaced by the version 2 scan.
    store
        .sync_file(&one_section_file("/a/b.dat#1", 0, 1_000, 2_000))
        .await
        .unwrap();
    store
        .sync_file(&one_section_file("/a/b.dat#1", 10 * 86_400, 1_000, 2_000))
        .await
        .unwrap();

    let report = store
        .sync_file(&one_section_file("/a/b.dat#2", 0, 1_100, 3_000))
        .await
        .unwrap();
    assert_eq!(report.deleted, 1);

    let rows = sqlx::query("SELECT filename, starttime FROM tsindex ORDER BY starttime")
        .fetch_all(store.pool())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<String, _>(0), "/a/b.dat#2");
    assert_eq!(rows[1].get::<String, _>(0), "/a/b.dat#1");
    store.close().await;
}

#[tokio::test]
async fn preservation_carries_across_filename_versions() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    store
        .sync_file(&one_section_file("/a/b.dat#1", 0, 1_000, 2_000))
        .await
        .unwrap();
    // Same content under the next version: updated survives the rename.
    let report = store
        .sync_file(&one_section_file("/a/b.dat#2", 0, 1_100, 3_000))
        .await
        .unwrap();
    assert_eq!(report.rows[0].updated, 1_000);
    store.close().await;
}

#[tokio::test]
async fn no_update_mode_skips_select_and_delete() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, true).await;
    let file = one_section_file("/data/a.mseed", 0, 1_000, 2_000);

    let first = store.sync_file(&file).await.unwrap();
    let second = store.sync_file(&file).await.unwrap();
    assert_eq!(first.matched, 0);
    assert_eq!(second.matched, 0);
    assert_eq!(second.deleted, 0);

    let count: i64 = sqlx::query("SELECT count(*) FROM tsindex")
        .fetch_one(store.pool())
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 2);
    store.close().await;
}

#[tokio::test]
async fn rate_mismatch_populates_timerates() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    let mut bytes = record(0, 1);
    bytes.extend(v3_record(&V3RecordSpec {
        sid: SID.to_string(),
        start_ns: 30 * NS,
        sample_rate: 100.5,
        sample_count: 3000,
        pub_version: 1,
        payload_len: (512 - 40 - SID.len()) as u32,
    }));
    let file = scan_bytes("/data/rates.mseed", bytes, 1_000, 2_000);
    store.sync_file(&file).await.unwrap();

    let timerates: Option<String> = sqlx::query("SELECT timerates FROM tsindex")
        .fetch_one(store.pool())
        .await
        .unwrap()
        .get(0);
    assert_eq!(timerates.as_deref(), Some("100,100.5"));
    store.close().await;
}

#[tokio::test]
async fn unparseable_source_id_applies_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;

    let mut file = one_section_file("/data/a.mseed", 0, 1_000, 2_000);
    file.sections[0].source_id = "JUNK".to_string();
    assert!(store.sync_file(&file).await.is_err());

    let count: i64 = sqlx::query("SELECT count(*) FROM tsindex")
        .fetch_one(store.pool())
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 0);
    store.close().await;
}

#[tokio::test]
async fn bad_version_suffix_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, false).await;
    let file = one_section_file("/a/b.dat#two", 0, 1_000, 2_000);
    assert!(store.sync_file(&file).await.is_err());
    store.close().await;
}
