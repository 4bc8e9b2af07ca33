//! Sync stage definitions and per-stage outcomes.

use serde::{Deserialize, Serialize};

/// The fixed stage sequence of a sync run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Fetch and select upstream releases.
    FetchReleases,

    /// Retrieve the manifest for each selected release.
    FetchManifests,

    /// Parse and validate manifests into a register catalog.
    Validate,

    /// Regenerate the target module and splice it into the target file.
    Render,

    /// Commit the target file when its content changed.
    Commit,
}

impl SyncStage {
    /// All stages, in execution order.
    pub const ALL: [SyncStage; 5] = [
        SyncStage::FetchReleases,
        SyncStage::FetchManifests,
        SyncStage::Validate,
        SyncStage::Render,
        SyncStage::Commit,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            SyncStage::FetchReleases => "fetch_releases",
            SyncStage::FetchManifests => "fetch_manifests",
            SyncStage::Validate => "validate",
            SyncStage::Render => "render",
            SyncStage::Commit => "commit",
        }
    }
}

/// Terminal status of one stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Which stage.
    pub stage: SyncStage,

    /// How it ended.
    pub status: StageStatus,

    /// Human-readable detail ("4 releases selected", "no changes", ...).
    pub detail: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StageOutcome {
    /// Whether this stage did not fail.
    pub fn passed(&self) -> bool {
        self.status != StageStatus::Failed
    }
}

/// Options controlling a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Render but neither write nor commit.
    pub dry_run: bool,

    /// Include releases marked as prereleases.
    pub include_prereleases: bool,

    /// Keep only the newest N releases after ordering.
    pub max_releases: Option<usize>,

    /// Commit message for the generated file.
    pub commit_message: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            include_prereleases: false,
            max_releases: None,
            commit_message: "Update iRock Modbus register tables".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(SyncStage::FetchReleases.name(), "fetch_releases");
        assert_eq!(SyncStage::FetchManifests.name(), "fetch_manifests");
        assert_eq!(SyncStage::Validate.name(), "validate");
        assert_eq!(SyncStage::Render.name(), "render");
        assert_eq!(SyncStage::Commit.name(), "commit");
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(SyncStage::ALL[0], SyncStage::FetchReleases);
        assert_eq!(SyncStage::ALL[4], SyncStage::Commit);
    }

    #[test]
    fn test_stage_serde_snake_case() {
        let json = serde_json::to_string(&SyncStage::FetchManifests).unwrap();
        assert_eq!(json, "\"fetch_manifests\"");
    }

    #[test]
    fn test_outcome_passed() {
        let outcome = StageOutcome {
            stage: SyncStage::Render,
            status: StageStatus::Skipped,
            detail: "dry run".to_string(),
            duration_ms: 1,
        };
        assert!(outcome.passed());

        let failed = StageOutcome {
            stage: SyncStage::Validate,
            status: StageStatus::Failed,
            detail: "overlap".to_string(),
            duration_ms: 1,
        };
        assert!(!failed.passed());
    }

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert!(!options.dry_run);
        assert!(!options.include_prereleases);
        assert!(options.max_releases.is_none());
        assert!(options.commit_message.contains("register tables"));
    }
}
