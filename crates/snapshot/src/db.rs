//! Database connection and pool management.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Files SQLite may leave next to the main database file.
const SIDECARS: [&str; 3] = ["-journal", "-wal", "-shm"];

/// A connection to one snapshot store.
///
/// Every run has exactly one writer, so the pool is capped at a single
/// connection. That also keeps `VACUUM` on the connection that wrote the
/// data.
#[derive(Debug, Clone)]
pub(crate) struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool })
    }

    /// Create an empty store at `path`, destroying any store already there.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub(crate) async fn create(path: &Path) -> Result<Self> {
        remove_store(path).await?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
        }
        let options = Self::base_options().filename(path).create_if_missing(true);
        let db = Self::new(options).await?;
        db.apply_schema().await?;
        Ok(db)
    }

    /// Open an existing store without write access.
    pub(crate) async fn open_read_only(path: &Path) -> Result<Self> {
        let options = Self::base_options().filename(path).read_only(true);
        Self::new(options).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // The published artifact must be a single self-contained file:
            // no WAL, and the rollback journal is deleted on commit.
            .journal_mode(SqliteJournalMode::Delete)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    async fn apply_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../queries/schema.sql"))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Rebuild the file with no free pages.
    #[instrument(level = "debug", skip(self))]
    pub(crate) async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for the connection to be returned first.
    pub(crate) async fn close(&self) {
        self.pool.close().await;
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Delete a store and any journal files it left behind.
pub(crate) async fn remove_store(path: &Path) -> Result<()> {
    let targets = std::iter::once(path.to_path_buf()).chain(SIDECARS.iter().map(|suffix| sidecar(path, suffix)));
    for target in targets {
        match tokio::fs::remove_file(&target).await {
            Ok(()) => tracing::debug!(path = %target.display(), "Removed previous store file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io(target.clone())),
        }
    }
    Ok(())
}
