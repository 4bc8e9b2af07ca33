//! In-memory run ledger (testing only).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    LedgerError, LedgerResult, RunEvent, RunId, RunLedger, RunMetadata, RunRecord, RunStatus,
    RunSummary,
};

#[derive(Debug)]
struct RunState {
    record: RunRecord,
    events: Vec<RunEvent>,
}

/// In-memory run ledger backed by a `HashMap<RunId, RunState>`.
#[derive(Debug, Default)]
pub struct MemoryRunLedger {
    runs: Mutex<HashMap<String, RunState>>,
}

impl MemoryRunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn finish(
        &self,
        run_id: &RunId,
        status: RunStatus,
        summary: RunSummary,
    ) -> LedgerResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| LedgerError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if state.record.status != RunStatus::Running {
            return Err(LedgerError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: state.record.status.to_string(),
                expected: "running".to_string(),
            });
        }
        state.record.status = status;
        state.record.summary = Some(summary);
        state.record.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl RunLedger for MemoryRunLedger {
    async fn create_run(&self, spec_digest: &str, metadata: RunMetadata) -> LedgerResult<RunId> {
        let run_id = RunId::new();
        let record = RunRecord {
            run_id: run_id.clone(),
            spec_digest: spec_digest.to_string(),
            metadata,
            status: RunStatus::Running,
            summary: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        let mut runs = self.runs.lock().unwrap();
        runs.insert(
            run_id.0.clone(),
            RunState {
                record,
                events: Vec::new(),
            },
        );
        Ok(run_id)
    }

    async fn append_event(&self, run_id: &RunId, event: RunEvent) -> LedgerResult<()> {
        let mut runs = self.runs.lock().unwrap();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| LedgerError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if state.record.status != RunStatus::Running {
            return Err(LedgerError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: state.record.status.to_string(),
                expected: "running".to_string(),
            });
        }
        state.events.push(event);
        Ok(())
    }

    async fn complete_run(&self, run_id: &RunId, summary: RunSummary) -> LedgerResult<()> {
        self.finish(run_id, RunStatus::Completed, summary)
    }

    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> LedgerResult<()> {
        self.finish(run_id, RunStatus::Failed, summary)
    }

    async fn get_run(&self, run_id: &RunId) -> LedgerResult<RunRecord> {
        let runs = self.runs.lock().unwrap();
        runs.get(&run_id.0)
            .map(|s| s.record.clone())
            .ok_or_else(|| LedgerError::RunNotFound {
                run_id: run_id.0.clone(),
            })
    }

    async fn get_events(&self, run_id: &RunId) -> LedgerResult<Vec<RunEvent>> {
        let runs = self.runs.lock().unwrap();
        let state = runs
            .get(&run_id.0)
            .ok_or_else(|| LedgerError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        let mut events = state.events.clone();
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }

    async fn list_runs(&self) -> LedgerResult<Vec<RunRecord>> {
        let runs = self.runs.lock().unwrap();
        let mut records: Vec<RunRecord> = runs.values().map(|s| s.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> RunMetadata {
        RunMetadata {
            git_sha: Some("a".repeat(40)),
            job_name: "regsync-test".to_string(),
            tags: json!({}),
        }
    }

    fn summary(success: bool) -> RunSummary {
        RunSummary {
            total_events: 1,
            duration_ms: 10,
            success,
            commit_sha: None,
        }
    }

    #[tokio::test]
    async fn test_create_append_complete() {
        let ledger = MemoryRunLedger::new();
        let run_id = ledger.create_run("digest", metadata()).await.unwrap();

        ledger
            .append_event(&run_id, RunEvent::new(1, "stage_started", json!({})))
            .await
            .unwrap();
        ledger.complete_run(&run_id, summary(true)).await.unwrap();

        let record = ledger.get_run(&run_id).await.unwrap();
        assert_eq!(record.status, RunStatus::Completed);
        assert!(record.summary.unwrap().success);
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_append_to_finished_run_rejected() {
        let ledger = MemoryRunLedger::new();
        let run_id = ledger.create_run("digest", metadata()).await.unwrap();
        ledger.fail_run(&run_id, summary(false)).await.unwrap();

        let err = ledger
            .append_event(&run_id, RunEvent::new(1, "stage_started", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRunState { .. }));
    }

    #[tokio::test]
    async fn test_events_sorted_by_seq() {
        let ledger = MemoryRunLedger::new();
        let run_id = ledger.create_run("digest", metadata()).await.unwrap();

        ledger
            .append_event(&run_id, RunEvent::new(2, "b", json!({})))
            .await
            .unwrap();
        ledger
            .append_event(&run_id, RunEvent::new(1, "a", json!({})))
            .await
            .unwrap();

        let events = ledger.get_events(&run_id).await.unwrap();
        assert_eq!(events[0].kind, "a");
        assert_eq!(events[1].kind, "b");
    }

    #[tokio::test]
    async fn test_unknown_run_errors() {
        let ledger = MemoryRunLedger::new();
        let missing = RunId("nope".to_string());
        assert!(matches!(
            ledger.get_run(&missing).await.unwrap_err(),
            LedgerError::RunNotFound { .. }
        ));
    }
}
