//! Snapshot Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Any of these aborts the build. The artifact at the working path is then
//! garbage and must not be published.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A snapshot error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Removing a previous store or creating its directory failed.
    #[display("filesystem error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    #[display("database error")]
    Database,
    /// A value could not be converted to or from its stored form.
    #[display("invalid snapshot data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// The finished store could not be opened and queried.
    #[display("snapshot failed read-back check")]
    ReadBack,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A locked or briefly unavailable file is the only transient case.
        matches!(self, Self::Io(_) | Self::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::InvalidData("record count").to_string(), "invalid snapshot data: record count");
        assert_eq!(ErrorKind::Io(PathBuf::from("/tmp/x.db")).to_string(), "filesystem error: /tmp/x.db");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Database.is_retryable());
        assert!(!ErrorKind::ReadBack.is_retryable());
    }
}
