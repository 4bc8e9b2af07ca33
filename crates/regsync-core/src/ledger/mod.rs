//! Run ledger: persistent record of sync runs and their events.
//!
//! Guarantees:
//! - Events are ordered by monotonic `seq` within a run.
//! - A run transitions Running → Completed | Failed (terminal).
//! - Completed runs are immutable.
//!
//! Backends: [`MemoryRunLedger`](memory::MemoryRunLedger) for tests,
//! [`FsRunLedger`](fs::FsRunLedger) for real runs.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Errors produced by ledger backends.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: String,
        status: String,
        expected: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Unique identifier for a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run id.
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata attached to a run at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Git SHA of the workspace at run start.
    pub git_sha: Option<String>,

    /// Job name (derived from the sync spec digest).
    pub job_name: String,

    /// Arbitrary key-value tags.
    pub tags: serde_json::Value,
}

/// A single event within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    /// Monotonic sequence number within the run.
    pub seq: u64,

    /// Event kind (e.g. "stage_started", "stage_completed").
    pub kind: String,

    /// Event payload.
    pub payload: serde_json::Value,

    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

impl RunEvent {
    /// Create an event stamped with the current time.
    pub fn new(seq: u64, kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            seq,
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Summary produced when a run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total events recorded.
    pub total_events: u64,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the run succeeded.
    pub success: bool,

    /// SHA of the commit the run created, if any.
    pub commit_sha: Option<String>,
}

/// Status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => f.write_str("running"),
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Full run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub spec_digest: String,
    pub metadata: RunMetadata,
    pub status: RunStatus,
    pub summary: Option<RunSummary>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Sync run ledger.
#[async_trait]
pub trait RunLedger: Send + Sync {
    /// Create a new run, returning its unique id.
    async fn create_run(&self, spec_digest: &str, metadata: RunMetadata) -> LedgerResult<RunId>;

    /// Append an event to an active run. Fails if the run already finished.
    async fn append_event(&self, run_id: &RunId, event: RunEvent) -> LedgerResult<()>;

    /// Mark a run as completed with a summary.
    async fn complete_run(&self, run_id: &RunId, summary: RunSummary) -> LedgerResult<()>;

    /// Mark a run as failed with a summary.
    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> LedgerResult<()>;

    /// Retrieve a run record by id.
    async fn get_run(&self, run_id: &RunId) -> LedgerResult<RunRecord>;

    /// Retrieve all events for a run, ordered by seq.
    async fn get_events(&self, run_id: &RunId) -> LedgerResult<Vec<RunEvent>>;

    /// List all run records, newest first.
    async fn list_runs(&self) -> LedgerResult<Vec<RunRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_unique_and_displayable() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
        assert!(!a.to_string().is_empty());
    }

    #[test]
    fn test_run_event_serde_roundtrip() {
        let event = RunEvent::new(3, "stage_started", serde_json::json!({"stage": "render"}));
        let json = serde_json::to_string(&event).unwrap();
        let back: RunEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seq, 3);
        assert_eq!(back.kind, "stage_started");
        assert_eq!(back.payload["stage"], "render");
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Running.to_string(), "running");
        assert_eq!(RunStatus::Completed.to_string(), "completed");
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }
}
