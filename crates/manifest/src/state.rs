//! What the client knows about the snapshot it already has.

use crate::error::{ErrorKind, Result, map_io_error};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The `(version, hash)` recorded for the local snapshot, plus whether the
/// snapshot file is actually there.
///
/// Persisted as a small JSON document next to the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub hash: String,
    /// Never persisted; always read from the filesystem.
    #[serde(skip)]
    pub exists: bool,
}

impl LocalState {
    /// `<snapshot>.state.json`
    pub fn path_for(snapshot: &Path) -> PathBuf {
        let mut name = OsString::from(snapshot.as_os_str());
        name.push(".state.json");
        PathBuf::from(name)
    }

    /// Load the state recorded for `snapshot`.
    ///
    /// A missing or unreadable state document yields an empty version, which
    /// the change-detection policy treats as needing an update rather than
    /// as a failure.
    pub async fn load(snapshot: impl AsRef<Path>) -> Result<Self> {
        let snapshot = snapshot.as_ref();
        let exists = tokio::fs::try_exists(snapshot).await.map_err(|e| map_io_error(e, snapshot))?;
        let path = Self::path_for(snapshot);
        let mut state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Self>(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable local state");
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(map_io_error(e, &path)),
        };
        state.exists = exists;
        Ok(state)
    }

    pub async fn save(&self, snapshot: impl AsRef<Path>) -> Result<()> {
        let path = Self::path_for(snapshot.as_ref());
        let json = serde_json::to_vec_pretty(self).or_raise(|| ErrorKind::InvalidState)?;
        tokio::fs::write(&path, json).await.map_err(|e| map_io_error(e, &path))
    }
}
