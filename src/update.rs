//! Client side: keep a local snapshot in step with a published manifest.

use crate::cli::{CheckArgs, LocalArgs, UpdateArgs};
use crate::error::{ErrorKind, Result};
use crate::fetch::Fetch;
use exn::ResultExt;
use marquee_config::{Config, VerifyMode};
use marquee_manifest::{
    LocalState, ManifestDescriptor, Recovery, Replacement, SnapshotProbe, UpdateDecision, Verification,
    VerificationReport, recover, verify,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Result of an `update` run.
#[derive(Debug)]
pub enum Outcome {
    UpToDate,
    Updated {
        decision: UpdateDecision,
        version: String,
        report: VerificationReport,
    },
}

/// Bad downloads are worth fetching again; anything else from the manifest
/// side is not.
fn classify(kind: &marquee_manifest::error::ErrorKind) -> ErrorKind {
    use marquee_manifest::error::ErrorKind as Manifest;
    match kind {
        Manifest::SizeMismatch { .. } | Manifest::HashMismatch { .. } | Manifest::ReadBack => ErrorKind::Integrity,
        _ => ErrorKind::Manifest,
    }
}

fn local_path(config: &Config, args: &LocalArgs) -> PathBuf {
    args.local.clone().unwrap_or_else(|| PathBuf::from(&config.snapshot.filename))
}

/// `<local>.download`, next to the snapshot so the swap is a rename.
fn download_path(local: &Path) -> PathBuf {
    let mut name = OsString::from(local.as_os_str());
    name.push(".download");
    PathBuf::from(name)
}

fn verification(config: &Config, args: &UpdateArgs) -> Verification {
    match args.verify.map(VerifyMode::from).unwrap_or(config.verify.mode) {
        VerifyMode::Strict => Verification::Strict,
        VerifyMode::Tolerant => Verification::Tolerant { tolerance: config.verify.tolerance },
    }
}

async fn fetch_manifest(location: &str, fetcher: &dyn Fetch) -> Result<ManifestDescriptor> {
    let bytes = fetcher.fetch(location).await?;
    ManifestDescriptor::from_slice(bytes).or_raise(|| ErrorKind::Manifest)
}

async fn evaluate(local: &Path, manifest: &ManifestDescriptor) -> Result<UpdateDecision> {
    let state = LocalState::load(local).await.or_raise(|| ErrorKind::Manifest)?;
    let decision = UpdateDecision::evaluate(&state, manifest);
    tracing::info!(local = %state.version, remote = %manifest.version, %decision, "Compared with published manifest");
    Ok(decision)
}

/// Report whether the published snapshot differs from the local one.
#[instrument(skip_all, fields(manifest = %args.target.manifest))]
pub async fn check(config: &Config, args: &CheckArgs, fetcher: &dyn Fetch) -> Result<UpdateDecision> {
    let local = local_path(config, &args.target);
    let manifest = fetch_manifest(&args.target.manifest, fetcher).await?;
    evaluate(&local, &manifest).await
}

/// Fetch, verify and install the published snapshot when it changed.
#[instrument(skip_all, fields(manifest = %args.target.manifest))]
pub async fn update(config: &Config, args: &UpdateArgs, fetcher: &dyn Fetch) -> Result<Outcome> {
    let local = local_path(config, &args.target);
    if recover(&local, &SnapshotProbe).await.or_raise(|| ErrorKind::Manifest)? == Recovery::Restored {
        tracing::warn!(local = %local.display(), "Previous update was interrupted; restored the old snapshot");
    }

    let manifest = fetch_manifest(&args.target.manifest, fetcher).await?;
    let decision = evaluate(&local, &manifest).await?;
    if !decision.needs_update() {
        return Ok(Outcome::UpToDate);
    }

    let source = args.snapshot.as_deref().unwrap_or(manifest.database.url.as_str());
    if source.is_empty() {
        tracing::error!("Manifest has no snapshot URL; pass --snapshot");
        exn::bail!(ErrorKind::Fetch(manifest.database.filename.clone()));
    }
    if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    let candidate = download_path(&local);
    let bytes = fetcher.fetch_to(source, &candidate).await?;
    tracing::debug!(source, bytes, "Downloaded candidate snapshot");

    let checked = verify(&candidate, &manifest.database, verification(config, args), config.manifest.chunk_size).await;
    let report = match checked {
        Ok(report) => report,
        Err(err) => {
            if let Err(e) = tokio::fs::remove_file(&candidate).await {
                tracing::warn!(candidate = %candidate.display(), error = %e, "Could not remove rejected download");
            }
            let kind = classify(&err);
            return Err(err.raise(kind));
        },
    };

    Replacement::begin(&local, &candidate)
        .await
        .or_raise(|| ErrorKind::Manifest)?
        .swap()
        .await
        .or_raise(|| ErrorKind::Manifest)?
        .confirm(&SnapshotProbe)
        .await
        .map_err(|err| {
            let kind = classify(&err);
            err.raise(kind)
        })?;

    let state = LocalState { version: manifest.version.clone(), hash: report.actual.hash.clone(), exists: true };
    state.save(&local).await.or_raise(|| ErrorKind::Manifest)?;
    tracing::info!(version = %manifest.version, exact = report.is_exact(), "Local snapshot updated");
    Ok(Outcome::Updated { decision, version: manifest.version, report })
}
