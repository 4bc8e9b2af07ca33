//! Release feed records.
//!
//! Typed view of the GitHub releases API response, plus the semver
//! normalization the pipeline orders releases by.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpstreamError};

/// A downloadable artifact attached to a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// One upstream release as reported by the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// Git tag of the release (e.g. `v2.0.0`).
    pub tag_name: String,

    /// Display name, if set.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the release is an unpublished draft.
    #[serde(default)]
    pub draft: bool,

    /// Whether the release is marked as a prerelease.
    #[serde(default)]
    pub prerelease: bool,

    /// Publication timestamp; drafts have none.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Source archive URL (kept for diagnostics; the manifest itself is
    /// fetched per file, not from the archive).
    #[serde(default)]
    pub zipball_url: Option<String>,

    /// Attached artifacts.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// Parse the release tag as a semantic version, stripping a leading `v`.
    pub fn version(&self) -> Result<Version> {
        let tag = self.tag_name.trim_start_matches('v');
        Version::parse(tag).map_err(|_| UpstreamError::InvalidTag(self.tag_name.clone()))
    }

    /// Find an attached asset by exact file name.
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_release_deserializes_feed_shape() {
        let release: Release = serde_json::from_value(json!({
            "tag_name": "v2.0.0",
            "name": "Modbus layout 2.0.0",
            "draft": false,
            "prerelease": false,
            "published_at": "2026-05-01T12:00:00Z",
            "zipball_url": "https://api.github.com/repos/Arvernus/iRock-Modbus/zipball/v2.0.0",
            "assets": [
                {"name": "data.yaml", "browser_download_url": "https://example.invalid/data.yaml"}
            ]
        }))
        .unwrap();

        assert_eq!(release.tag_name, "v2.0.0");
        assert!(!release.prerelease);
        assert_eq!(release.assets.len(), 1);
        assert!(release.asset("data.yaml").is_some());
        assert!(release.asset("other.yaml").is_none());
    }

    #[test]
    fn test_version_strips_leading_v() {
        let release: Release =
            serde_json::from_value(json!({"tag_name": "v1.2.3"})).unwrap();
        assert_eq!(release.version().unwrap(), Version::new(1, 2, 3));

        let bare: Release = serde_json::from_value(json!({"tag_name": "1.2.3"})).unwrap();
        assert_eq!(bare.version().unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_non_semver_tag_rejected() {
        let release: Release =
            serde_json::from_value(json!({"tag_name": "test-build"})).unwrap();
        assert!(matches!(
            release.version(),
            Err(UpstreamError::InvalidTag(_))
        ));
    }
}
