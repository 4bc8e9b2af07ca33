//! Error types for regsync-provision

use thiserror::Error;

/// Errors that can occur while provisioning a device
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The bundled archive is missing
    #[error("archive not found: {0}")]
    ArchiveMissing(String),

    /// A provisioning step could not be spawned
    #[error("failed to run {command}: {reason}")]
    SpawnFailed { command: String, reason: String },

    /// A provisioning step timed out
    #[error("step {step} timed out after {timeout_secs} seconds")]
    Timeout { step: String, timeout_secs: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;
