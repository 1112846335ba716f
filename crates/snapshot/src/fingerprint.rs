//! Logical content fingerprint.
//!
//! The manifest's byte hash changes whenever the file layout does, even if
//! the rows are identical. This digest covers only the ordered record
//! content, so two snapshots of the same catalog always agree on it.

use marquee_catalog::Record;

/// BLAKE3 over every column of every record, in order.
///
/// Each value is length-prefixed so that moving bytes between adjacent
/// columns changes the digest.
pub fn fingerprint<'a>(records: impl IntoIterator<Item = &'a Record>) -> String {
    let mut hasher = blake3::Hasher::new();
    for record in records {
        for column in record.columns() {
            hasher.update(&(column.len() as u64).to_le_bytes());
            hasher.update(column.as_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
