//! Read access to a finished snapshot.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use marquee_catalog::Record;
use std::path::Path;
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: i64,
    title: String,
    sub_category: String,
    country: String,
    description: String,
    poster: String,
    thumbnail: String,
    rating: String,
    duration: String,
    year: String,
    main_category: String,
    servers_json: String,
    seasons_json: String,
    related_json: String,
}
impl From<EntryRow> for StoredRecord {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            record: Record {
                title: row.title,
                sub_category: row.sub_category,
                country: row.country,
                description: row.description,
                poster: row.poster,
                thumbnail: row.thumbnail,
                rating: row.rating,
                duration: row.duration,
                year: row.year,
                main_category: row.main_category,
                servers: row.servers_json,
                seasons: row.seasons_json,
                related: row.related_json,
            },
        }
    }
}

/// A record as stored, with the surrogate id assigned on insert.
///
/// Ids are only meaningful within one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub record: Record,
}

/// Read-only handle on a snapshot file.
#[derive(Debug)]
pub struct SnapshotReader {
    db: Database,
}

impl SnapshotReader {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open_read_only(path.as_ref()).await?;
        Ok(Self { db })
    }

    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_entries.sql"))
            .fetch_one(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("record count"))
    }

    /// Value stored under `key` in the metadata table.
    pub async fn metadata(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar(include_str!("../queries/get_metadata.sql"))
            .bind(key)
            .fetch_optional(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Every record, in insertion order.
    pub async fn records(&self) -> Result<Vec<StoredRecord>> {
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_entries.sql"))
            .fetch_all(self.db.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(StoredRecord::from).collect())
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}

/// Trivial read-back check: open the file and count its records.
///
/// Any failure, including a file that isn't a snapshot at all, is reported
/// as [`ErrorKind::ReadBack`].
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub async fn probe(path: impl AsRef<Path>) -> Result<u64> {
    let reader = SnapshotReader::open(path).await.or_raise(|| ErrorKind::ReadBack)?;
    let count = reader.count().await;
    reader.close().await;
    count.or_raise(|| ErrorKind::ReadBack)
}
