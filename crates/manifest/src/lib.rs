//! Release manifests and client-side change detection.
//!
//! The publishing side describes a finished snapshot with
//! [`build_manifest`]: its exact size, its SHA-256 and a version tag. A client
//! holding an older snapshot compares its [`LocalState`] against the
//! published [`ManifestDescriptor`] with [`needs_update`] and, if needed,
//! downloads the new snapshot, checks it with [`verify`] and swaps it in
//! through a [`Replacement`].
//!
//! Version equality is the primary "nothing changed" signal. Hash equality
//! is sufficient but not necessary: compaction layout alone changes the
//! bytes of a logically identical snapshot.

mod build;
mod descriptor;
mod digest;
pub mod error;
mod policy;
mod replace;
mod state;
mod verify;

pub use crate::build::{ManifestOptions, build_manifest, default_description, default_version};
pub use crate::descriptor::{DatabaseInfo, ManifestDescriptor, ManifestMetadata, UpdateInfo};
pub use crate::digest::{DEFAULT_CHUNK_SIZE, FileDigest, digest_file, same_hash};
pub use crate::policy::{UpdateDecision, needs_update};
pub use crate::replace::{Phase, ReadBack, Recovery, Replacement, SnapshotProbe, Staged, Swapped, backup_path, recover};
pub use crate::state::LocalState;
pub use crate::verify::{DEFAULT_TOLERANCE, Verification, VerificationReport, relative_difference, verify};
