//! Change detection: does the client need the published snapshot?

use crate::descriptor::ManifestDescriptor;
use crate::digest::same_hash;
use crate::state::LocalState;
use derive_more::Display;

/// Why a client should, or shouldn't, fetch the published snapshot.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum UpdateDecision {
    /// Nothing on disk yet.
    #[display("no local snapshot")]
    FirstAcquisition,
    /// A snapshot exists but its recorded version is unset, so its identity
    /// is unknown.
    #[display("local snapshot has no recorded version")]
    CorruptedState,
    #[display("version changed: {local} -> {remote}")]
    VersionChanged { local: String, remote: String },
    /// Same version tag, different bytes.
    #[display("hash changed for version {version}")]
    HashChanged { version: String },
    #[display("up to date")]
    UpToDate,
}

impl UpdateDecision {
    pub fn evaluate(local: &LocalState, remote: &ManifestDescriptor) -> Self {
        if !local.exists {
            return Self::FirstAcquisition;
        }
        if local.version.trim().is_empty() {
            return Self::CorruptedState;
        }
        if local.version != remote.version {
            return Self::VersionChanged {
                local: local.version.clone(),
                remote: remote.version.clone(),
            };
        }
        if !same_hash(&local.hash, &remote.database.hash) {
            return Self::HashChanged { version: remote.version.clone() };
        }
        Self::UpToDate
    }

    pub fn needs_update(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

/// Either a version change or a hash change alone is enough.
pub fn needs_update(local: &LocalState, remote: &ManifestDescriptor) -> bool {
    UpdateDecision::evaluate(local, remote).needs_update()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DatabaseInfo;
    use rstest::rstest;

    fn remote(version: &str, hash: &str) -> ManifestDescriptor {
        ManifestDescriptor {
            version: version.to_string(),
            description: String::new(),
            created_at: String::new(),
            database: DatabaseInfo {
                filename: "playlist.db".to_string(),
                url: String::new(),
                size_bytes: 0,
                size_mb: 0.0,
                hash: hash.to_string(),
                modified_time: String::new(),
            },
            metadata: None,
            update_info: None,
        }
    }

    fn local(version: &str, hash: &str, exists: bool) -> LocalState {
        LocalState { version: version.to_string(), hash: hash.to_string(), exists }
    }

    #[rstest]
    #[case(local("", "", false), remote("v1", "h1"), UpdateDecision::FirstAcquisition)]
    // Stale state left behind after the snapshot itself was deleted.
    #[case(local("v1", "h1", false), remote("v1", "h1"), UpdateDecision::FirstAcquisition)]
    #[case(local("", "h1", true), remote("v1", "h1"), UpdateDecision::CorruptedState)]
    #[case(local("  ", "h1", true), remote("v1", "h1"), UpdateDecision::CorruptedState)]
    #[case(
        local("v1", "h", true),
        remote("v2", "h"),
        UpdateDecision::VersionChanged { local: "v1".into(), remote: "v2".into() }
    )]
    #[case(local("v2", "h1", true), remote("v2", "h2"), UpdateDecision::HashChanged { version: "v2".into() })]
    #[case(local("v2", "h2", true), remote("v2", "h2"), UpdateDecision::UpToDate)]
    #[case(local("v2", "ABCD", true), remote("v2", "abcd"), UpdateDecision::UpToDate)]
    fn test_evaluate(#[case] local: LocalState, #[case] remote: ManifestDescriptor, #[case] expected: UpdateDecision) {
        assert_eq!(UpdateDecision::evaluate(&local, &remote), expected);
    }

    #[rstest]
    #[case("v1")]
    #[case("v2")]
    #[case("")]
    fn test_first_acquisition_always_updates(#[case] version: &str) {
        assert!(needs_update(&local("", "", false), &remote(version, "anything")));
    }

    #[test]
    fn test_identical_state_never_updates() {
        assert!(!needs_update(&local("v2", "h2", true), &remote("v2", "h2")));
    }

    #[test]
    fn test_version_change_alone_updates() {
        assert!(needs_update(&local("v1", "h", true), &remote("v2", "h")));
    }
}
