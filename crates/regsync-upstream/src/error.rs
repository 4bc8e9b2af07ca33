//! Error types for regsync-upstream

use thiserror::Error;

/// Errors that can occur while talking to the upstream release feed
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Upstream answered with a non-success status
    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Release tag is not a semantic version
    #[error("release tag is not a semantic version: {0}")]
    InvalidTag(String),

    /// No manifest could be retrieved for a release
    #[error("no manifest named {manifest} for release {tag}")]
    ManifestNotFound { tag: String, manifest: String },

    /// JSON decoding error
    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Http(err.to_string())
    }
}

/// Result type for upstream operations
pub type Result<T> = std::result::Result<T, UpstreamError>;
