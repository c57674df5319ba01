//! Store synchronization phase.
//!
//! Scanning is synchronous; the store drivers are async. A current-thread
//! runtime is built here and torn down once the last file is reconciled.

use crate::{output, Cli};
use anyhow::{Context, Result};
use mseedidx_core::FileEntry;
use mseedidx_db::{
    IndexStore, PostgresStore, PostgresStoreConfig, SqliteStore, SqliteStoreConfig,
};
use std::time::Duration;
use tracing::info;

/// Reconcile every scanned file against each configured backend.
pub fn run(cli: &Cli, files: &[FileEntry]) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("cannot build async runtime")?;

    runtime.block_on(async {
        let stores = open_stores(cli).await?;
        let result = sync_all(cli, &stores, files).await;
        for store in &stores {
            store.close().await;
        }
        result
    })
}

async fn open_stores(cli: &Cli) -> Result<Vec<Box<dyn IndexStore>>> {
    let mut stores: Vec<Box<dyn IndexStore>> = Vec::new();

    if let Some(path) = &cli.sqlite {
        let store = SqliteStore::open(SqliteStoreConfig {
            path: path.clone(),
            table: cli.table.clone(),
            busy_timeout: Duration::from_millis(cli.busy_timeout),
            no_update: cli.no_update,
        })
        .await
        .with_context(|| format!("cannot open SQLite database {}", path.display()))?;
        stores.push(Box::new(store));
    }

    if let Some(host) = &cli.pg_host {
        let store = PostgresStore::connect(PostgresStoreConfig {
            host: host.clone(),
            port: cli.pg_port,
            database: cli.db_name.clone(),
            user: cli.db_user.clone(),
            password: cli.db_pass.clone(),
            table: cli.table.clone(),
            no_update: cli.no_update,
        })
        .await
        .with_context(|| format!("cannot connect to PostgreSQL host {host}"))?;
        stores.push(Box::new(store));
    }

    Ok(stores)
}

async fn sync_all(
    cli: &Cli,
    stores: &[Box<dyn IndexStore>],
    files: &[FileEntry],
) -> Result<()> {
    for store in stores {
        for file in files {
            info!(path = %file.path, store = %store.describe(), "synchronizing sections");
            let report = store
                .sync_file(file)
                .await
                .with_context(|| format!("synchronizing {} with {}", file.path, store.describe()))?;
            info!(
                path = %file.path,
                matched = report.matched,
                deleted = report.deleted,
                inserted = report.rows.len(),
                "synchronized"
            );
            if cli.echo_rows() {
                output::echo_rows(file, &report.rows)?;
            }
        }
    }
    Ok(())
}
