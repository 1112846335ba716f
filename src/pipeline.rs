//! Publishing side: catalog in, snapshot and manifest out.

use crate::cli::BuildArgs;
use crate::error::{ErrorKind, Result};
use crate::fetch::Fetch;
use exn::ResultExt;
use marquee_catalog::{Catalog, RecordSet, RegroupOptions, normalize};
use marquee_config::Config;
use marquee_manifest::{ManifestDescriptor, ManifestOptions, UpdateInfo, build_manifest};
use marquee_snapshot::{SnapshotHandle, SnapshotOptions, build_snapshot, working_path};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Everything a build produced.
#[derive(Debug)]
pub struct Published {
    pub snapshot: SnapshotHandle,
    pub manifest: ManifestDescriptor,
    pub manifest_path: PathBuf,
}

fn regroup_options(config: &Config) -> RegroupOptions {
    RegroupOptions {
        series_category: config.catalog.series_category.clone(),
        episode_delimiter: config.catalog.episode_delimiter.clone(),
        series_description_prefix: config.catalog.series_description_prefix.clone(),
    }
}

fn manifest_options(config: &Config) -> ManifestOptions {
    ManifestOptions {
        base_url: config.manifest.base_url.clone(),
        published_name: Some(config.snapshot.filename.clone()),
        chunk_size: config.manifest.chunk_size,
        update_info: UpdateInfo {
            force_update: config.manifest.force_update,
            min_app_version: config.manifest.min_app_version.clone(),
            recommended_update: config.manifest.recommended_update,
        },
    }
}

async fn read_catalog(config: &Config, args: &BuildArgs, fetcher: &dyn Fetch) -> Result<Vec<u8>> {
    if let Some(input) = &args.input {
        return tokio::fs::read(input).await.or_raise(|| ErrorKind::Io(input.clone()));
    }
    let location = args.url.as_deref().unwrap_or(config.source.url.as_str());
    if location.is_empty() {
        tracing::error!("No catalog given: pass --input or --url, or set source.url");
        exn::bail!(ErrorKind::Config);
    }
    fetcher.fetch(location).await
}

fn report(set: &RecordSet) {
    if set.diagnostics.is_empty() {
        return;
    }
    tracing::warn!(skipped = set.diagnostics.skipped(), "Some catalog units were skipped");
    for diagnostic in set.diagnostics.iter() {
        tracing::debug!(%diagnostic, "Skipped");
    }
}

/// Run the whole publishing pipeline into `args.out_dir`.
///
/// The snapshot is assembled and described at a working path. The previous
/// snapshot and manifest are only replaced, each by a rename, once both new
/// ones are complete.
#[instrument(skip_all, fields(out_dir = %args.out_dir.display()))]
pub async fn build(config: &Config, args: &BuildArgs, fetcher: &dyn Fetch) -> Result<Published> {
    let bytes = read_catalog(config, args, fetcher).await?;
    let catalog = Catalog::from_slice(&bytes).or_raise(|| ErrorKind::Catalog)?;
    let set = normalize(&catalog, &regroup_options(config)).or_raise(|| ErrorKind::Catalog)?;
    report(&set);

    let out_dir: &Path = &args.out_dir;
    tokio::fs::create_dir_all(out_dir).await.or_raise(|| ErrorKind::Io(out_dir.to_path_buf()))?;

    // The tag is stored inside the snapshot too, so settle it first.
    let version = match &args.version {
        Some(version) => version.clone(),
        None => marquee_manifest::default_version(time::UtcDateTime::now()).or_raise(|| ErrorKind::Manifest)?,
    };
    let snapshot_options = SnapshotOptions {
        data_version: version.clone(),
        compact: config.snapshot.compact,
    };
    let snapshot_path = out_dir.join(&config.snapshot.filename);
    let snapshot = build_snapshot(&set, working_path(&snapshot_path), &snapshot_options)
        .await
        .or_raise(|| ErrorKind::Snapshot)?;

    let mut manifest = build_manifest(&snapshot, Some(version.as_str()), args.description.as_deref(), &manifest_options(config))
        .await
        .or_raise(|| ErrorKind::Manifest)?;
    if let Some(url) = &args.db_url {
        manifest.database.url = url.clone();
    }
    let snapshot = snapshot.persist(&snapshot_path).await.or_raise(|| ErrorKind::Snapshot)?;
    let manifest_path = out_dir.join(&config.manifest.filename);
    manifest.save(&manifest_path).await.or_raise(|| ErrorKind::Manifest)?;

    tracing::info!(
        version = %manifest.version,
        records = snapshot.record_count(),
        manifest = %manifest_path.display(),
        "Published",
    );
    Ok(Published { snapshot, manifest, manifest_path })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fetch::FileFetcher;
    use marquee_snapshot::SnapshotReader;
    use serde_json::json;
    use tempfile::TempDir;

    pub(crate) fn write_catalog(dir: &Path) -> PathBuf {
        let path = dir.join("catalog.json");
        let document = json!({
            "Categories": [
                {"MainCategory": "Movies", "SubCategories": ["Drama"], "Entries": [
                    {"Title": "Heat", "Year": 1995, "Rating": 8.3}
                ]},
                {"MainCategory": "TV Series", "Entries": [
                    {"Title": "Dune S01E02", "Seasons": {"season": 1, "episode": 2}},
                    {"Title": "Dune S01E01", "Seasons": {"season": 1, "episode": 1}},
                    {"Title": "Arcane", "Year": 2021}
                ]}
            ]
        });
        std::fs::write(&path, serde_json::to_vec(&document).unwrap()).unwrap();
        path
    }

    pub(crate) fn args(input: PathBuf, out_dir: PathBuf, version: Option<&str>) -> BuildArgs {
        BuildArgs {
            input: Some(input),
            url: None,
            version: version.map(str::to_string),
            description: None,
            out_dir,
            db_url: None,
        }
    }

    #[tokio::test]
    async fn test_build_writes_snapshot_and_manifest() {
        let dir = TempDir::new().unwrap();
        let input = write_catalog(dir.path());
        let mut config = Config::default();
        config.manifest.base_url = "https://cdn.test/data/".to_string();

        let published = build(&config, &args(input, dir.path().join("out"), Some("v1")), &FileFetcher)
            .await
            .unwrap();
        assert_eq!(published.snapshot.record_count(), 3);
        assert_eq!(published.manifest.version, "v1");
        assert_eq!(published.manifest.database.url, "https://cdn.test/data/playlist.db");
        assert_eq!(published.manifest.metadata.as_ref().unwrap().total_entries, 3);

        let saved = ManifestDescriptor::load(&published.manifest_path).await.unwrap();
        assert_eq!(saved, published.manifest);

        let reader = SnapshotReader::open(published.snapshot.path()).await.unwrap();
        let titles: Vec<String> = reader.records().await.unwrap().into_iter().map(|s| s.record.title).collect();
        assert_eq!(titles, vec!["Heat", "Arcane", "Dune"]);
        reader.close().await;
    }

    #[tokio::test]
    async fn test_rebuild_with_same_tag_is_identical() {
        let dir = TempDir::new().unwrap();
        let input = write_catalog(dir.path());
        let config = Config::default();
        let build_args = args(input, dir.path().join("out"), Some("v1"));

        let first = build(&config, &build_args, &FileFetcher).await.unwrap();
        let second = build(&config, &build_args, &FileFetcher).await.unwrap();
        assert_eq!(first.manifest.database.hash, second.manifest.database.hash);
        assert_eq!(first.manifest.database.size_bytes, second.manifest.database.size_bytes);
        assert_eq!(first.snapshot.fingerprint(), second.snapshot.fingerprint());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_release() {
        let dir = TempDir::new().unwrap();
        let input = write_catalog(dir.path());
        let out = dir.path().join("out");
        let config = Config::default();
        let first = build(&config, &args(input.clone(), out.clone(), Some("v1")), &FileFetcher).await.unwrap();
        let snapshot_bytes = std::fs::read(first.snapshot.path()).unwrap();
        let manifest_bytes = std::fs::read(&first.manifest_path).unwrap();

        // A directory where the store's rollback journal must go makes the
        // next build fail before anything is written.
        std::fs::create_dir(out.join("playlist.db.building-journal")).unwrap();
        let err = build(&config, &args(input, out.clone(), Some("v2")), &FileFetcher).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Snapshot);

        assert_eq!(std::fs::read(out.join("playlist.db")).unwrap(), snapshot_bytes);
        assert_eq!(std::fs::read(out.join("manifest.json")).unwrap(), manifest_bytes);
        let manifest = ManifestDescriptor::load(out.join("manifest.json")).await.unwrap();
        assert_eq!(manifest.version, "v1");
    }

    #[tokio::test]
    async fn test_build_leaves_only_published_files() {
        let dir = TempDir::new().unwrap();
        let input = write_catalog(dir.path());
        let out = dir.path().join("out");
        build(&Config::default(), &args(input, out.clone(), Some("v1")), &FileFetcher).await.unwrap();
        let mut files: Vec<_> = std::fs::read_dir(&out).unwrap().map(|e| e.unwrap().file_name()).collect();
        files.sort();
        assert_eq!(files, vec![std::ffi::OsString::from("manifest.json"), std::ffi::OsString::from("playlist.db")]);
    }

    #[tokio::test]
    async fn test_db_url_overrides_base_url() {
        let dir = TempDir::new().unwrap();
        let input = write_catalog(dir.path());
        let mut config = Config::default();
        config.manifest.base_url = "https://cdn.test".to_string();
        let mut build_args = args(input, dir.path().to_path_buf(), None);
        build_args.db_url = Some("https://mirror.test/latest.db".to_string());

        let published = build(&config, &build_args, &FileFetcher).await.unwrap();
        assert_eq!(published.manifest.database.url, "https://mirror.test/latest.db");
        assert_eq!(published.manifest.version.len(), "YYYYMMDD_HHMMSS".len());
    }

    #[tokio::test]
    async fn test_build_without_source() {
        let dir = TempDir::new().unwrap();
        let build_args = BuildArgs { input: None, ..args(PathBuf::new(), dir.path().to_path_buf(), None) };
        let err = build(&Config::default(), &build_args, &FileFetcher).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_build_rejects_malformed_catalog() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("catalog.json");
        std::fs::write(&input, b"{not json").unwrap();
        let err = build(&Config::default(), &args(input, dir.path().to_path_buf(), None), &FileFetcher)
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Catalog);
    }
}
