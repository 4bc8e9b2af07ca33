//! Filesystem-backed run ledger.
//!
//! Layout: `<root>/<run_id>/record.json` + `<root>/<run_id>/events.json`.
//! Writes go through a temp file in the run directory and are renamed into
//! place, so readers never observe a half-written document. Events are
//! rewritten wholesale on append; runs record a handful of stage events, so
//! the quadratic rewrite never matters.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;

use super::{
    LedgerError, LedgerResult, RunEvent, RunId, RunLedger, RunMetadata, RunRecord, RunStatus,
    RunSummary,
};

/// Filesystem run ledger rooted at a directory (default `.regsync/runs`).
#[derive(Debug, Clone)]
pub struct FsRunLedger {
    root: PathBuf,
}

impl FsRunLedger {
    /// Open (creating if needed) a ledger rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> LedgerResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(&run_id.0)
    }

    fn read_record(&self, run_id: &RunId) -> LedgerResult<RunRecord> {
        let path = self.run_dir(run_id).join("record.json");
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LedgerError::RunNotFound {
                    run_id: run_id.0.clone(),
                }
            } else {
                LedgerError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn read_events(&self, run_id: &RunId) -> LedgerResult<Vec<RunEvent>> {
        let path = self.run_dir(run_id).join("events.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_json<T: serde::Serialize>(&self, dir: &Path, name: &str, value: &T) -> LedgerResult<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(value)?)?;
        tmp.persist(dir.join(name)).map_err(|e| LedgerError::Io(e.error))?;
        Ok(())
    }

    fn ensure_running(&self, record: &RunRecord) -> LedgerResult<()> {
        if record.status != RunStatus::Running {
            return Err(LedgerError::InvalidRunState {
                run_id: record.run_id.0.clone(),
                status: record.status.to_string(),
                expected: "running".to_string(),
            });
        }
        Ok(())
    }

    fn finish(
        &self,
        run_id: &RunId,
        status: RunStatus,
        summary: RunSummary,
    ) -> LedgerResult<()> {
        let mut record = self.read_record(run_id)?;
        self.ensure_running(&record)?;
        record.status = status;
        record.summary = Some(summary);
        record.completed_at = Some(Utc::now());
        self.write_json(&self.run_dir(run_id), "record.json", &record)
    }
}

#[async_trait]
impl RunLedger for FsRunLedger {
    async fn create_run(&self, spec_digest: &str, metadata: RunMetadata) -> LedgerResult<RunId> {
        let run_id = RunId::new();
        let dir = self.run_dir(&run_id);
        fs::create_dir_all(&dir)?;

        let record = RunRecord {
            run_id: run_id.clone(),
            spec_digest: spec_digest.to_string(),
            metadata,
            status: RunStatus::Running,
            summary: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.write_json(&dir, "record.json", &record)?;
        self.write_json(&dir, "events.json", &Vec::<RunEvent>::new())?;
        Ok(run_id)
    }

    async fn append_event(&self, run_id: &RunId, event: RunEvent) -> LedgerResult<()> {
        let record = self.read_record(run_id)?;
        self.ensure_running(&record)?;

        let mut events = self.read_events(run_id)?;
        events.push(event);
        self.write_json(&self.run_dir(run_id), "events.json", &events)
    }

    async fn complete_run(&self, run_id: &RunId, summary: RunSummary) -> LedgerResult<()> {
        self.finish(run_id, RunStatus::Completed, summary)
    }

    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> LedgerResult<()> {
        self.finish(run_id, RunStatus::Failed, summary)
    }

    async fn get_run(&self, run_id: &RunId) -> LedgerResult<RunRecord> {
        self.read_record(run_id)
    }

    async fn get_events(&self, run_id: &RunId) -> LedgerResult<Vec<RunEvent>> {
        let _ = self.read_record(run_id)?;
        let mut events = self.read_events(run_id)?;
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }

    async fn list_runs(&self) -> LedgerResult<Vec<RunRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = RunId(entry.file_name().to_string_lossy().into_owned());
            match self.read_record(&run_id) {
                Ok(record) => records.push(record),
                // Stray directories without a record are not ours to report.
                Err(LedgerError::RunNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
