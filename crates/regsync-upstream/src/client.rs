//! HTTP client for the upstream release feed.
//!
//! Talks to the GitHub REST API for the release list and to the raw-content
//! host for the per-release manifest. An attached release asset with the
//! manifest's file name is used as a fallback when the tagged tree does not
//! carry the file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, UpstreamError};
use crate::release::Release;
use crate::source::ReleaseSource;

/// Upstream feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// REST API base URL
    pub api_base: String,
    /// Raw content base URL
    pub raw_base: String,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Manifest file name inside the release's tree
    pub manifest_path: String,
    /// Authentication token (optional; unauthenticated requests are rate-limited)
    pub token: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            owner: "Arvernus".to_string(),
            repo: "iRock-Modbus".to_string(),
            manifest_path: "data.yaml".to_string(),
            token: std::env::var("REGSYNC_GITHUB_TOKEN").ok(),
        }
    }
}

impl UpstreamConfig {
    /// Create a config from environment variables and defaults
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific repository
    pub fn new(owner: &str, repo: &str) -> Self {
        UpstreamConfig {
            owner: owner.to_string(),
            repo: repo.to_string(),
            ..Self::default()
        }
    }

    /// Override the manifest file name
    pub fn with_manifest_path(mut self, path: &str) -> Self {
        self.manifest_path = path.to_string();
        self
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Repository slug (`owner/repo`)
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Client for the upstream release feed
pub struct UpstreamClient {
    config: UpstreamConfig,
    http_client: reqwest::Client,
}

impl UpstreamClient {
    /// Create a new client
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("regsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(UpstreamError::from)?;

        Ok(UpstreamClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(UpstreamConfig::from_env())
    }

    /// Access the resolved configuration
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        let response = self.authorize(self.http_client.get(url)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl ReleaseSource for UpstreamClient {
    /// Fetch the full release list, newest entry first as reported upstream.
    async fn list_releases(&self) -> Result<Vec<Release>> {
        let url = format!(
            "{}/repos/{}/{}/releases?per_page=100",
            self.config.api_base, self.config.owner, self.config.repo
        );
        info!(url = %url, "fetching upstream releases");

        let response = self
            .authorize(self.http_client.get(&url))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let releases: Vec<Release> = response.json().await?;
        debug!(count = releases.len(), "release feed decoded");
        Ok(releases)
    }

    /// Fetch the manifest text for one release.
    async fn fetch_manifest(&self, release: &Release) -> Result<String> {
        // Primary path: the manifest file in the tagged tree.
        let raw_url = format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_base,
            self.config.owner,
            self.config.repo,
            release.tag_name,
            self.config.manifest_path
        );
        debug!(url = %raw_url, tag = %release.tag_name, "fetching manifest");

        if let Some(text) = self.fetch_text(&raw_url).await? {
            return Ok(text);
        }

        // Fallback: a release asset with the same file name.
        if let Some(asset) = release.asset(&self.config.manifest_path) {
            warn!(
                tag = %release.tag_name,
                "manifest missing from tagged tree, using release asset"
            );
            if let Some(text) = self.fetch_text(&asset.browser_download_url).await? {
                return Ok(text);
            }
        }

        Err(UpstreamError::ManifestNotFound {
            tag: release.tag_name.clone(),
            manifest: self.config.manifest_path.clone(),
        })
    }
}
