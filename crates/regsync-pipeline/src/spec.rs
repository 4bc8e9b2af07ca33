//! Sync specification and identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::stage::SyncStage;

/// Sync pipeline specification.
///
/// Identifies one sync configuration; its digest links ledger runs of the
/// same configuration together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSpec {
    /// Git work tree the generated file lives in.
    pub workspace: PathBuf,

    /// Upstream repository slug (`owner/repo`).
    pub repo_slug: String,

    /// Manifest file name inside each release.
    pub manifest_path: String,

    /// Target file, relative to the workspace root.
    pub target_file: PathBuf,

    /// Git commit SHA of the workspace at run start.
    pub git_sha: String,

    /// SHA-256 digest of the ordered stage names.
    pub stages_digest: String,
}

impl SyncSpec {
    /// Create a new sync specification over the builtin stage sequence.
    pub fn new(
        workspace: PathBuf,
        repo_slug: String,
        manifest_path: String,
        target_file: PathBuf,
        git_sha: String,
    ) -> Self {
        let stages_digest = compute_stages_digest(SyncStage::ALL.map(|s| s.name()).as_slice());
        Self {
            workspace,
            repo_slug,
            manifest_path,
            target_file,
            git_sha,
            stages_digest,
        }
    }

    /// Stable digest of the whole specification.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.workspace.to_string_lossy().as_ref(),
            &self.repo_slug,
            &self.manifest_path,
            self.target_file.to_string_lossy().as_ref(),
            &self.git_sha,
            &self.stages_digest,
        ] {
            hasher.update(part.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Job name used in run metadata.
    pub fn job_name(&self) -> String {
        format!("regsync-{}", &self.digest()[..12])
    }
}

/// Compute deterministic digest of ordered stage names.
fn compute_stages_digest(stages: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for stage in stages {
        hasher.update(stage.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
