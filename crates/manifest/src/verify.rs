//! Post-download verification of a candidate snapshot against its manifest.
//!
//! Two modes:
//! - [`Verification::Strict`]: any size or hash mismatch is an error. The
//!   caller discards the download (and may retry).
//! - [`Verification::Tolerant`]: opt-in. Mismatches only produce warnings, so
//!   a client will adopt a snapshot that doesn't byte-match its manifest
//!   rather than be left with no working data. The hash is only compared
//!   when the size is within the relative tolerance.

use crate::descriptor::DatabaseInfo;
use crate::digest::{FileDigest, digest_file, same_hash};
use crate::error::{ErrorKind, Result};
use std::path::Path;
use tracing::instrument;

/// Relative size tolerance used when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.10;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Verification {
    #[default]
    Strict,
    /// The client records the hash of the file it actually installed. After
    /// a mismatch is accepted, that hash differs from the manifest's, so
    /// every later check reports
    /// [`UpdateDecision::HashChanged`](crate::UpdateDecision::HashChanged)
    /// and downloads again until a new release is published.
    Tolerant {
        /// Largest accepted `|actual - expected| / expected` before the hash
        /// comparison is skipped.
        tolerance: f64,
    },
}

/// What verification found. Only produced when the candidate was accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    /// Size and hash of the candidate as downloaded.
    pub actual: FileDigest,
    /// Whether the hash comparison was performed at all.
    pub hash_checked: bool,
    /// Mismatches accepted under tolerant verification.
    pub warnings: Vec<String>,
}
impl VerificationReport {
    /// Candidate matches the manifest exactly.
    pub fn is_exact(&self) -> bool {
        self.hash_checked && self.warnings.is_empty()
    }
}

/// `|actual - expected| / expected`. An empty expected size only matches an
/// empty file.
pub fn relative_difference(expected: u64, actual: u64) -> f64 {
    if expected == 0 {
        return if actual == 0 { 0.0 } else { f64::INFINITY };
    }
    expected.abs_diff(actual) as f64 / expected as f64
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

/// Check the file at `path` against the manifest's `database` block.
#[instrument(skip_all, fields(path = %path.as_ref().display(), mode = ?mode))]
pub async fn verify(
    path: impl AsRef<Path>,
    expected: &DatabaseInfo,
    mode: Verification,
    chunk_size: usize,
) -> Result<VerificationReport> {
    let actual = digest_file(path, chunk_size).await?;
    let mut warnings = Vec::new();

    let tolerance = match mode {
        Verification::Strict => {
            if actual.size != expected.size_bytes {
                exn::bail!(ErrorKind::SizeMismatch { expected: expected.size_bytes, actual: actual.size });
            }
            if !same_hash(&actual.hash, &expected.hash) {
                exn::bail!(ErrorKind::HashMismatch { expected: expected.hash.clone(), actual: actual.hash });
            }
            return Ok(VerificationReport { actual, hash_checked: true, warnings });
        },
        Verification::Tolerant { tolerance } => tolerance,
    };

    let difference = relative_difference(expected.size_bytes, actual.size);
    if difference > tolerance {
        warn(
            &mut warnings,
            format!(
                "size differs by {:.1}% (expected {} bytes, got {}); skipping hash check",
                difference * 100.0,
                expected.size_bytes,
                actual.size
            ),
        );
        return Ok(VerificationReport { actual, hash_checked: false, warnings });
    }
    if actual.size != expected.size_bytes {
        warn(
            &mut warnings,
            format!(
                "size differs by {:.1}% (expected {} bytes, got {}), within tolerance",
                difference * 100.0,
                expected.size_bytes,
                actual.size
            ),
        );
    }
    if !same_hash(&actual.hash, &expected.hash) {
        warn(&mut warnings, format!("hash mismatch (expected {}, got {}); accepting anyway", expected.hash, actual.hash));
    }
    Ok(VerificationReport { actual, hash_checked: true, warnings })
}
