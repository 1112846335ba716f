//! Manifest Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Integrity failures ([`ErrorKind::SizeMismatch`], [`ErrorKind::HashMismatch`])
//! are only raised by strict verification. Tolerant verification reports them
//! as warnings instead.

use derive_more::{Display, Error};
use std::path::{Path, PathBuf};

/// A manifest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The manifest document is not valid JSON or lacks required fields.
    #[display("invalid manifest")]
    InvalidManifest,
    #[display("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
    #[display("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        #[error(not(source))]
        expected: String,
        #[error(not(source))]
        actual: String,
    },
    /// The snapshot the manifest describes could not be inspected.
    #[display("snapshot error")]
    Snapshot,
    /// The replacement snapshot failed its read-back check and was rolled back.
    #[display("replacement snapshot failed read-back check")]
    ReadBack,
    /// Restoring the previous snapshot failed. Manual intervention needed.
    #[display("rollback failed: {}", _0.display())]
    Rollback(#[error(not(source))] PathBuf),
    /// The persisted local state could not be written.
    #[display("invalid local state")]
    InvalidState,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A corrupt or truncated download is worth fetching again.
        matches!(self, Self::Io(_) | Self::SizeMismatch { .. } | Self::HashMismatch { .. } | Self::ReadBack)
    }
}

/// Map an I/O failure on `path`, keeping "not found" distinguishable.
pub(crate) fn map_io_error(e: std::io::Error, path: &Path) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound => exn::Exn::from(ErrorKind::NotFound(path.to_path_buf())),
        _ => exn::Exn::from(e).raise(ErrorKind::Io(path.to_path_buf())),
    }
}
