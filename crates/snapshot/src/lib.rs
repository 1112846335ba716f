//! Single-file SQLite snapshot of a normalized catalog.
//!
//! Every build is destructive: whatever is at the target path is deleted and
//! the store is rebuilt from the full record set. There is no partial-update
//! path. Build at a [`working_path`] and [`SnapshotHandle::persist`] the
//! result so a failed run never touches the last published snapshot.
//!
//! # Layout
//! - `entries`: one row per [`Record`](marquee_catalog::Record), in record
//!   set order, with the three nested blobs stored as JSON text. Indexed on
//!   title, both category columns and year.
//! - `categories`: one row per input category.
//! - `snapshot_metadata`: key/value pairs (see [`keys`]). No timestamps are
//!   stored, so identical input produces a byte-identical file.

mod db;
pub mod error;
mod fingerprint;
mod reader;
mod writer;

pub use crate::fingerprint::fingerprint;
pub use crate::reader::{SnapshotReader, StoredRecord, probe};
use crate::db::Database;
use crate::error::{ErrorKind, Result};
use marquee_catalog::RecordSet;
use std::collections::BTreeMap;
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Keys of the `snapshot_metadata` table.
pub mod keys {
    pub const DATA_VERSION: &str = "data_version";
    pub const RECORD_COUNT: &str = "record_count";
    pub const CONTENT_FINGERPRINT: &str = "content_fingerprint";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Version tag written into the metadata table.
    pub data_version: String,
    /// Run `VACUUM` once everything is inserted.
    pub compact: bool,
}
impl Default for SnapshotOptions {
    fn default() -> Self {
        Self { data_version: String::new(), compact: true }
    }
}

/// `<path>.building`: where the snapshot for `path` is assembled.
pub fn working_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".building");
    PathBuf::from(name)
}

/// A finished snapshot artifact.
///
/// Callers only get to look at it; the store itself stays opaque so the way
/// it is produced can change without touching the manifest side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    path: PathBuf,
    record_count: usize,
    fingerprint: String,
    category_counts: BTreeMap<String, usize>,
}
impl SnapshotHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// BLAKE3 digest of the logical record content.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Number of records per main-category, sorted by category name.
    pub fn category_counts(&self) -> &BTreeMap<String, usize> {
        &self.category_counts
    }

    /// Move the finished store onto `dest` with a single rename.
    ///
    /// `dest` must be on the same filesystem. Whatever was at `dest` stays in
    /// place until the rename succeeds.
    #[instrument(skip_all, fields(from = %self.path.display(), to = %dest.as_ref().display()))]
    pub async fn persist(self, dest: impl AsRef<Path>) -> Result<Self> {
        let dest = dest.as_ref();
        tokio::fs::rename(&self.path, dest).await.or_raise(|| ErrorKind::Io(dest.to_path_buf()))?;
        tracing::debug!("Snapshot moved into place");
        Ok(Self { path: dest.to_path_buf(), ..self })
    }
}

/// Build a fresh snapshot at `path` from a normalized record set.
#[instrument(skip_all, fields(path = %path.as_ref().display(), records = set.records.len()))]
pub async fn build_snapshot(set: &RecordSet, path: impl AsRef<Path>, options: &SnapshotOptions) -> Result<SnapshotHandle> {
    let path = path.as_ref();
    let fingerprint = fingerprint(&set.records);
    let record_count = set.records.len().to_string();
    let metadata = [
        (keys::DATA_VERSION, options.data_version.as_str()),
        (keys::RECORD_COUNT, record_count.as_str()),
        (keys::CONTENT_FINGERPRINT, fingerprint.as_str()),
    ];

    let db = Database::create(path).await?;
    let written = async {
        writer::insert_all(&db, set, &metadata).await?;
        if options.compact {
            db.vacuum().await?;
        }
        Ok::<_, error::Error>(())
    }
    .await;
    // Close before surfacing any error so no handle stays open on the file.
    db.close().await;
    written?;

    let stored = probe(path).await?;
    if usize::try_from(stored).ok() != Some(set.records.len()) {
        tracing::error!(expected = set.records.len(), stored, "Snapshot record count mismatch");
        exn::bail!(ErrorKind::ReadBack);
    }

    let mut category_counts = BTreeMap::new();
    for record in &set.records {
        *category_counts.entry(record.main_category.clone()).or_insert(0) += 1;
    }
    tracing::info!(records = set.records.len(), fingerprint = %fingerprint, "Snapshot built");
    Ok(SnapshotHandle {
        path: path.to_path_buf(),
        record_count: set.records.len(),
        fingerprint,
        category_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_catalog::{Catalog, CategoryRecord, Record, RegroupOptions, normalize};
    use rstest::rstest;
    use tempfile::TempDir;

    fn record_set() -> RecordSet {
        let document = br#"{
            "Categories": [
                {"MainCategory": "Movies", "SubCategories": ["Drama"], "Entries": [
                    {"Title": "Heat", "Year": 1995, "Rating": 8.3, "Servers": [{"name": "HD", "url": "u"}]},
                    {"Title": "Ran", "Year": 1985}
                ]},
                {"MainCategory": "TV Series", "Entries": [
                    {"Title": "Dune S01E02", "Seasons": {"season": 1, "episode": 2}},
                    {"Title": "Dune S01E01", "Seasons": {"season": 1, "episode": 1}}
                ]}
            ]
        }"#;
        let catalog = Catalog::from_slice(document).unwrap();
        normalize(&catalog, &RegroupOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_build_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlist.db");
        let set = record_set();
        let options = SnapshotOptions { data_version: "v7".to_string(), ..SnapshotOptions::default() };
        let handle = build_snapshot(&set, &path, &options).await.unwrap();

        assert_eq!(handle.path(), path);
        assert_eq!(handle.record_count(), 3);
        assert_eq!(handle.fingerprint(), fingerprint(&set.records));
        assert_eq!(handle.category_counts().get("Movies"), Some(&2));
        assert_eq!(handle.category_counts().get("TV Series"), Some(&1));

        let reader = SnapshotReader::open(&path).await.unwrap();
        let stored: Vec<Record> = reader.records().await.unwrap().into_iter().map(|s| s.record).collect();
        assert_eq!(stored, set.records);
        assert_eq!(reader.metadata(keys::DATA_VERSION).await.unwrap().as_deref(), Some("v7"));
        assert_eq!(reader.metadata(keys::RECORD_COUNT).await.unwrap().as_deref(), Some("3"));
        assert_eq!(
            reader.metadata(keys::CONTENT_FINGERPRINT).await.unwrap().as_deref(),
            Some(handle.fingerprint())
        );
        assert_eq!(reader.metadata("missing").await.unwrap(), None);
        reader.close().await;
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    #[tokio::test]
    async fn test_rebuild_is_byte_identical(#[case] compact: bool) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlist.db");
        let set = record_set();
        let options = SnapshotOptions { data_version: "v1".to_string(), compact };

        build_snapshot(&set, &path, &options).await.unwrap();
        let first = std::fs::read(&path).unwrap();
        build_snapshot(&set, &path, &options).await.unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlist.db");
        build_snapshot(&record_set(), &path, &SnapshotOptions::default()).await.unwrap();

        let smaller = RecordSet {
            records: vec![Record { title: "Solo".to_string(), ..Record::default() }],
            categories: vec![CategoryRecord { main_category: "Misc".to_string(), sub_categories: "[]".to_string() }],
            ..RecordSet::default()
        };
        let handle = build_snapshot(&smaller, &path, &SnapshotOptions::default()).await.unwrap();
        assert_eq!(handle.record_count(), 1);
        assert_eq!(probe(&path).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_record_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlist.db");
        let handle = build_snapshot(&RecordSet::default(), &path, &SnapshotOptions::default()).await.unwrap();
        assert_eq!(handle.record_count(), 0);
        assert!(handle.category_counts().is_empty());
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_persist_replaces_published_snapshot() {
        let dir = TempDir::new().unwrap();
        let published = dir.path().join("playlist.db");
        std::fs::write(&published, b"previous release").unwrap();

        let working = working_path(&published);
        assert_eq!(working, dir.path().join("playlist.db.building"));
        let handle = build_snapshot(&record_set(), &working, &SnapshotOptions::default()).await.unwrap();
        let built = std::fs::read(&working).unwrap();
        // Nothing published is touched until the rename.
        assert_eq!(std::fs::read(&published).unwrap(), b"previous release");

        let handle = handle.persist(&published).await.unwrap();
        assert_eq!(handle.path(), published);
        assert_eq!(handle.record_count(), 3);
        assert_eq!(std::fs::read(&published).unwrap(), built);
        assert!(!working.exists());
        assert_eq!(probe(&published).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_persist_missing_working_file() {
        let dir = TempDir::new().unwrap();
        let working = dir.path().join("playlist.db.building");
        let handle = build_snapshot(&RecordSet::default(), &working, &SnapshotOptions::default()).await.unwrap();
        std::fs::remove_file(&working).unwrap();
        let err = handle.persist(dir.path().join("playlist.db")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[tokio::test]
    async fn test_no_sidecar_files_left() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlist.db");
        build_snapshot(&record_set(), &path, &SnapshotOptions::default()).await.unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(files, vec![std::ffi::OsString::from("playlist.db")]);
    }
}
