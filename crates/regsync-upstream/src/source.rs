//! The `ReleaseSource` abstraction and its in-memory fixture.
//!
//! The pipeline only needs two operations from upstream; keeping them
//! behind a trait lets tests run the full pipeline against canned data.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, UpstreamError};
use crate::release::Release;

/// Source of upstream releases and their manifests.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the full release list.
    async fn list_releases(&self) -> Result<Vec<Release>>;

    /// Fetch the manifest text for one release.
    async fn fetch_manifest(&self, release: &Release) -> Result<String>;
}

/// In-memory release source backed by canned releases and manifests.
#[derive(Debug, Default)]
pub struct FixtureSource {
    releases: Vec<Release>,
    manifests: Mutex<HashMap<String, String>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a release together with its manifest text.
    pub fn with_release(mut self, release: Release, manifest: &str) -> Self {
        self.manifests
            .get_mut()
            .unwrap()
            .insert(release.tag_name.clone(), manifest.to_string());
        self.releases.push(release);
        self
    }

    /// Add a release that has no manifest (fetch will fail).
    pub fn with_manifestless_release(mut self, release: Release) -> Self {
        self.releases.push(release);
        self
    }
}

#[async_trait]
impl ReleaseSource for FixtureSource {
    async fn list_releases(&self) -> Result<Vec<Release>> {
        Ok(self.releases.clone())
    }

    async fn fetch_manifest(&self, release: &Release) -> Result<String> {
        let manifests = self.manifests.lock().unwrap();
        manifests
            .get(&release.tag_name)
            .cloned()
            .ok_or_else(|| UpstreamError::ManifestNotFound {
                tag: release.tag_name.clone(),
                manifest: "data.yaml".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release(tag: &str) -> Release {
        serde_json::from_value(json!({"tag_name": tag})).unwrap()
    }

    #[tokio::test]
    async fn test_fixture_roundtrip() {
        let source = FixtureSource::new()
            .with_release(release("v1.0.0"), "modbus_version: \"1.0.0\"")
            .with_manifestless_release(release("v0.9.0"));

        let releases = source.list_releases().await.unwrap();
        assert_eq!(releases.len(), 2);

        let manifest = source.fetch_manifest(&releases[0]).await.unwrap();
        assert!(manifest.contains("1.0.0"));

        let err = source.fetch_manifest(&releases[1]).await.unwrap_err();
        assert!(matches!(err, UpstreamError::ManifestNotFound { .. }));
    }
}
