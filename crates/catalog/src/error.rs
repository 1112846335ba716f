//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.
//!
//! Only whole-document failures are errors. A single malformed entry never
//! aborts a run; it is recorded as a [`Diagnostic`](crate::Diagnostic)
//! instead.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document is not JSON, or its category list has the wrong shape.
    #[display("invalid catalog document")]
    InvalidDocument,
    /// A nested structure could not be encoded into its blob form.
    #[display("failed to encode field: {_0}")]
    Encode(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The document is either usable or it isn't.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::InvalidDocument.to_string(), "invalid catalog document");
        assert_eq!(ErrorKind::Encode("servers").to_string(), "failed to encode field: servers");
        assert!(!ErrorKind::InvalidDocument.is_retryable());
    }
}
