//! Byte-level fingerprint of a snapshot artifact.

use crate::error::{ErrorKind, Result, map_io_error};
use exn::ResultExt;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::instrument;

/// Read size used when the caller has no preference.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Exact size and SHA-256 of a file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    /// Lowercase hex, 64 characters.
    pub hash: String,
}

/// Hash a file in fixed-size chunks, so memory use doesn't depend on its size.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub async fn digest_file(path: impl AsRef<Path>, chunk_size: usize) -> Result<FileDigest> {
    let path = path.as_ref();
    let mut file = tokio::fs::File::open(path).await.map_err(|e| map_io_error(e, path))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut size = 0u64;
    loop {
        let read = file.read(&mut buffer).await.or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }
    Ok(FileDigest { size, hash: format!("{:x}", hasher.finalize()) })
}

/// Case-insensitive comparison of two hex digests.
pub fn same_hash(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
