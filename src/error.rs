//! Binary Error Types
//!
//! Each variant names the stage that failed. The library error underneath is
//! kept as a child frame, so `{:?}` prints the whole tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    /// Retrieving a document or snapshot failed.
    #[display("failed to fetch {_0}")]
    Fetch(#[error(not(source))] String),
    #[display("catalog error")]
    Catalog,
    #[display("snapshot error")]
    Snapshot,
    #[display("manifest error")]
    Manifest,
    /// A downloaded snapshot did not match its manifest or did not read back.
    #[display("downloaded snapshot failed its integrity check")]
    Integrity,
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Integrity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Fetch("https://cdn.test/m.json".into()), true)]
    #[case(ErrorKind::Integrity, true)]
    #[case(ErrorKind::Manifest, false)]
    #[case(ErrorKind::Config, false)]
    fn test_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }
}
