//! Putting a verified candidate in place of the local snapshot.
//!
//! 1. [`Replacement::begin`] copies the current local snapshot to
//!    `<local>.backup`.
//! 2. [`Replacement::swap`] renames the candidate onto the local path. A
//!    rename never leaves a moment where neither file exists.
//! 3. [`Replacement::confirm`] reads the new snapshot back. Success removes
//!    the backup; failure moves the backup back into place.
//!
//! If the process dies anywhere between 1 and 3, the previous snapshot is
//! still in the backup location and [`recover`] restores it on next start.

use crate::error::{ErrorKind, Result, map_io_error};
use async_trait::async_trait;
use exn::ResultExt;
use std::ffi::OsString;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Trivial usability check run against a snapshot after it is put in place.
#[async_trait]
pub trait ReadBack: Send + Sync {
    async fn check(&self, path: &Path) -> Result<()>;
}

/// Read-back by opening the snapshot and counting its records.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotProbe;

#[async_trait]
impl ReadBack for SnapshotProbe {
    async fn check(&self, path: &Path) -> Result<()> {
        let records = marquee_snapshot::probe(path).await.or_raise(|| ErrorKind::ReadBack)?;
        tracing::debug!(path = %path.display(), records, "Read-back succeeded");
        Ok(())
    }
}

/// `<local>.backup`
pub fn backup_path(local: &Path) -> PathBuf {
    let mut name = OsString::from(local.as_os_str());
    name.push(".backup");
    PathBuf::from(name)
}

async fn exists(path: &Path) -> Result<bool> {
    tokio::fs::try_exists(path).await.map_err(|e| map_io_error(e, path))
}

mod sealed {
    pub trait Sealed {}
}
pub trait Phase: sealed::Sealed {}

/// Backup taken, candidate not yet in place.
#[derive(Debug)]
pub struct Staged;
impl sealed::Sealed for Staged {}
impl Phase for Staged {}

/// Candidate in place, not yet confirmed.
#[derive(Debug)]
pub struct Swapped;
impl sealed::Sealed for Swapped {}
impl Phase for Swapped {}

/// One in-flight replacement of `local` by `candidate`.
///
/// The candidate must live on the same filesystem as `local` so the swap is
/// a rename.
#[derive(Debug)]
pub struct Replacement<P: Phase = Staged> {
    local: PathBuf,
    candidate: PathBuf,
    /// `None` when there was no local snapshot to back up.
    backup: Option<PathBuf>,
    _phase: PhantomData<P>,
}

impl<P: Phase> Replacement<P> {
    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }
}

impl Replacement<Staged> {
    #[instrument(skip_all, fields(local = %local.as_ref().display()))]
    pub async fn begin(local: impl AsRef<Path>, candidate: impl AsRef<Path>) -> Result<Self> {
        let local = local.as_ref().to_path_buf();
        let candidate = candidate.as_ref().to_path_buf();
        if !exists(&candidate).await? {
            exn::bail!(ErrorKind::NotFound(candidate));
        }
        let backup = if exists(&local).await? {
            let backup = backup_path(&local);
            tokio::fs::copy(&local, &backup).await.map_err(|e| map_io_error(e, &backup))?;
            tracing::info!(backup = %backup.display(), "Backed up current snapshot");
            Some(backup)
        } else {
            None
        };
        Ok(Self { local, candidate, backup, _phase: PhantomData })
    }

    /// Move the candidate onto the local path.
    pub async fn swap(self) -> Result<Replacement<Swapped>> {
        tokio::fs::rename(&self.candidate, &self.local)
            .await
            .map_err(|e| map_io_error(e, &self.candidate))?;
        tracing::debug!(local = %self.local.display(), "Candidate moved into place");
        Ok(Replacement {
            local: self.local,
            candidate: self.candidate,
            backup: self.backup,
            _phase: PhantomData,
        })
    }
}

impl Replacement<Swapped> {
    /// Keep the new snapshot if it reads back, otherwise restore the old one.
    #[instrument(skip_all, fields(local = %self.local.display()))]
    pub async fn confirm(self, probe: &dyn ReadBack) -> Result<()> {
        if let Err(err) = probe.check(&self.local).await {
            tracing::warn!(error = ?err, "New snapshot failed read-back, rolling back");
            self.rollback().await?;
            return Err(err);
        }
        if let Some(backup) = &self.backup {
            // The new snapshot is good; a leftover backup is only clutter.
            if let Err(e) = tokio::fs::remove_file(backup).await {
                tracing::warn!(backup = %backup.display(), error = %e, "Could not remove backup");
            }
        }
        tracing::info!("Snapshot replaced");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        match &self.backup {
            Some(backup) => tokio::fs::rename(backup, &self.local)
                .await
                .or_raise(|| ErrorKind::Rollback(self.local.clone()))?,
            None => match tokio::fs::remove_file(&self.local).await {
                Ok(()) => {},
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e).or_raise(|| ErrorKind::Rollback(self.local.clone())),
            },
        }
        tracing::warn!(local = %self.local.display(), "Previous snapshot restored");
        Ok(())
    }
}

/// What [`recover`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// No backup was left behind.
    Clean,
    /// The backup was moved back into place.
    Restored,
    /// The local snapshot reads back fine, so the stale backup was deleted.
    BackupDiscarded,
}

/// Finish or undo a replacement that was interrupted.
///
/// Run before anything else touches `local`. A missing local snapshot, or
/// one that fails read-back, is replaced by the backup.
#[instrument(skip_all, fields(local = %local.as_ref().display()))]
pub async fn recover(local: impl AsRef<Path>, probe: &dyn ReadBack) -> Result<Recovery> {
    let local = local.as_ref();
    let backup = backup_path(local);
    if !exists(&backup).await? {
        return Ok(Recovery::Clean);
    }
    if exists(local).await? && probe.check(local).await.is_ok() {
        tokio::fs::remove_file(&backup).await.map_err(|e| map_io_error(e, &backup))?;
        tracing::info!(backup = %backup.display(), "Discarded stale backup");
        return Ok(Recovery::BackupDiscarded);
    }
    tokio::fs::rename(&backup, local).await.or_raise(|| ErrorKind::Rollback(local.to_path_buf()))?;
    tracing::warn!("Restored snapshot from backup after interrupted replacement");
    Ok(Recovery::Restored)
}
