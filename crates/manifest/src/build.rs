//! Assembling the manifest for a freshly built snapshot.

use crate::descriptor::{DatabaseInfo, ManifestDescriptor, ManifestMetadata, UpdateInfo};
use crate::digest::{DEFAULT_CHUNK_SIZE, digest_file};
use crate::error::{ErrorKind, Result, map_io_error};
use exn::{OptionExt, ResultExt};
use marquee_snapshot::SnapshotHandle;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcDateTime};
use tracing::instrument;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Hosting location of the snapshot. The published URL is this joined
    /// with the snapshot's file name; empty means "not yet published".
    pub base_url: String,
    /// File name the snapshot is published under, when it is described
    /// before being moved from its working path.
    pub published_name: Option<String>,
    pub chunk_size: usize,
    pub update_info: UpdateInfo,
}
impl Default for ManifestOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            published_name: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            update_info: UpdateInfo::default(),
        }
    }
}

/// Version tag used when none is supplied, e.g. `20240501_120000`.
pub fn default_version(now: UtcDateTime) -> Result<String> {
    now.format(format_description!("[year][month][day]_[hour][minute][second]"))
        .or_raise(|| ErrorKind::InvalidManifest)
}

/// Description used when none is supplied.
pub fn default_description(now: UtcDateTime) -> Result<String> {
    let stamp = now
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .or_raise(|| ErrorKind::InvalidManifest)?;
    Ok(format!("Database update - {stamp}"))
}

fn join_url(base: &str, filename: &str) -> String {
    let base = base.trim();
    if base.is_empty() {
        return String::new();
    }
    format!("{}/{}", base.trim_end_matches('/'), filename)
}

fn rfc3339(at: OffsetDateTime) -> Result<String> {
    at.format(&Rfc3339).or_raise(|| ErrorKind::InvalidManifest)
}

/// Describe the snapshot behind `handle`.
///
/// The hash and size are taken from the file as it is on disk now, so this
/// must run after the snapshot is finalized.
#[instrument(skip_all, fields(path = %handle.path().display()))]
pub async fn build_manifest(
    handle: &SnapshotHandle,
    version: Option<&str>,
    description: Option<&str>,
    options: &ManifestOptions,
) -> Result<ManifestDescriptor> {
    let path = handle.path();
    let now = UtcDateTime::now();
    let digest = digest_file(path, options.chunk_size).await.or_raise(|| ErrorKind::Snapshot)?;
    let modified = tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .map_err(|e| map_io_error(e, path))?;
    let modified_time = rfc3339(OffsetDateTime::from(modified))?;
    let filename = match &options.published_name {
        Some(name) => name.clone(),
        None => path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_raise(|| ErrorKind::Snapshot)?
            .to_string(),
    };

    let version = match version {
        Some(version) => version.to_string(),
        None => default_version(now)?,
    };
    let description = match description {
        Some(description) => description.to_string(),
        None => default_description(now)?,
    };

    let manifest = ManifestDescriptor {
        version,
        description,
        created_at: rfc3339(now.into())?,
        database: DatabaseInfo {
            url: join_url(&options.base_url, &filename),
            filename,
            size_bytes: digest.size,
            size_mb: (digest.size as f64 / BYTES_PER_MIB * 100.0).round() / 100.0,
            hash: digest.hash,
            modified_time: modified_time.clone(),
        },
        metadata: Some(ManifestMetadata {
            total_entries: handle.record_count(),
            categories: handle.category_counts().clone(),
            content_fingerprint: handle.fingerprint().to_string(),
            last_updated: modified_time,
        }),
        update_info: Some(options.update_info.clone()),
    };
    tracing::info!(
        version = %manifest.version,
        size = manifest.database.size_bytes,
        hash = %manifest.database.hash,
        "Manifest built",
    );
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest_file;
    use marquee_catalog::{Record, RecordSet};
    use marquee_snapshot::{SnapshotOptions, build_snapshot};
    use rstest::rstest;
    use tempfile::TempDir;
    use time::macros::utc_datetime;

    async fn snapshot(dir: &TempDir) -> SnapshotHandle {
        let set = RecordSet {
            records: vec![
                Record { title: "Heat".to_string(), main_category: "Movies".to_string(), ..Record::default() },
                Record { title: "Dune".to_string(), main_category: "TV Series".to_string(), ..Record::default() },
            ],
            ..RecordSet::default()
        };
        build_snapshot(&set, dir.path().join("playlist.db"), &SnapshotOptions::default()).await.unwrap()
    }

    #[test]
    fn test_default_version_and_description() {
        let now = utc_datetime!(2024-05-01 09:08:07);
        assert_eq!(default_version(now).unwrap(), "20240501_090807");
        assert_eq!(default_description(now).unwrap(), "Database update - 2024-05-01 09:08:07");
    }

    #[rstest]
    #[case("", "")]
    #[case("   ", "")]
    #[case("https://cdn.test/releases", "https://cdn.test/releases/playlist.db")]
    #[case("https://cdn.test/releases/", "https://cdn.test/releases/playlist.db")]
    fn test_join_url(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(join_url(base, "playlist.db"), expected);
    }

    #[tokio::test]
    async fn test_build_manifest() {
        let dir = TempDir::new().unwrap();
        let handle = snapshot(&dir).await;
        let options = ManifestOptions {
            base_url: "https://cdn.test".to_string(),
            ..ManifestOptions::default()
        };
        let manifest = build_manifest(&handle, Some("v9"), Some("Spring refresh"), &options).await.unwrap();
        let digest = digest_file(handle.path(), DEFAULT_CHUNK_SIZE).await.unwrap();

        assert_eq!(manifest.version, "v9");
        assert_eq!(manifest.description, "Spring refresh");
        assert_eq!(manifest.database.filename, "playlist.db");
        assert_eq!(manifest.database.url, "https://cdn.test/playlist.db");
        assert_eq!(manifest.database.size_bytes, digest.size);
        assert_eq!(manifest.database.hash, digest.hash);
        assert_eq!(manifest.database.hash.len(), 64);
        let metadata = manifest.metadata.unwrap();
        assert_eq!(metadata.total_entries, 2);
        assert_eq!(metadata.categories.get("Movies"), Some(&1));
        assert_eq!(metadata.content_fingerprint, handle.fingerprint());
        assert_eq!(manifest.update_info, Some(UpdateInfo::default()));
    }

    #[tokio::test]
    async fn test_published_name_overrides_working_name() {
        let dir = TempDir::new().unwrap();
        let set = RecordSet {
            records: vec![Record { title: "Heat".to_string(), ..Record::default() }],
            ..RecordSet::default()
        };
        let handle = build_snapshot(&set, dir.path().join("playlist.db.building"), &SnapshotOptions::default())
            .await
            .unwrap();
        let options = ManifestOptions {
            base_url: "https://cdn.test".to_string(),
            published_name: Some("playlist.db".to_string()),
            ..ManifestOptions::default()
        };
        let manifest = build_manifest(&handle, Some("v1"), None, &options).await.unwrap();
        assert_eq!(manifest.database.filename, "playlist.db");
        assert_eq!(manifest.database.url, "https://cdn.test/playlist.db");
    }

    #[tokio::test]
    async fn test_build_manifest_defaults() {
        let dir = TempDir::new().unwrap();
        let handle = snapshot(&dir).await;
        let manifest = build_manifest(&handle, None, None, &ManifestOptions::default()).await.unwrap();
        assert_eq!(manifest.version.len(), "20240501_120000".len());
        assert!(manifest.description.starts_with("Database update - "));
        assert_eq!(manifest.database.url, "");
        assert!(OffsetDateTime::parse(&manifest.created_at, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn test_same_snapshot_same_hash() {
        let first_dir = TempDir::new().unwrap();
        let second_dir = TempDir::new().unwrap();
        let first = build_manifest(&snapshot(&first_dir).await, Some("v1"), None, &ManifestOptions::default())
            .await
            .unwrap();
        let second = build_manifest(&snapshot(&second_dir).await, Some("v1"), None, &ManifestOptions::default())
            .await
            .unwrap();
        assert_eq!(first.database.hash, second.database.hash);
        assert_eq!(first.database.size_bytes, second.database.size_bytes);
    }
}
