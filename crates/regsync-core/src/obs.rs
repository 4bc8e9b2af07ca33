//! Structured observability hooks for sync run lifecycle events.
//!
//! Events are emitted at `info!` level; set `RUST_LOG` for filtering and
//! pass `--json` to the CLI for newline-delimited JSON output.

use tracing::info;

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("regsync.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: sync run started.
pub fn emit_sync_started(run_id: &str, job_name: &str) {
    info!(event = "sync.started", run_id = %run_id, job_name = %job_name);
}

/// Emit event: a stage started.
pub fn emit_stage_started(run_id: &str, stage: &str) {
    info!(event = "sync.stage_started", run_id = %run_id, stage = %stage);
}

/// Emit event: a stage finished.
pub fn emit_stage_finished(run_id: &str, stage: &str, success: bool, duration_ms: u64) {
    info!(
        event = "sync.stage_finished",
        run_id = %run_id,
        stage = %stage,
        success = success,
        duration_ms = duration_ms,
    );
}

/// Emit event: sync run finished.
pub fn emit_sync_finished(run_id: &str, duration_ms: u64, total_events: u64, success: bool) {
    info!(
        event = "sync.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total_events = total_events,
        success = success,
    );
}

/// Emit event: a commit was created for the generated file.
pub fn emit_commit_created(run_id: &str, sha: &str) {
    info!(event = "sync.commit_created", run_id = %run_id, sha = %sha);
}

/// Emit event: gate evaluation completed.
pub fn emit_gate_evaluated(run_id: &str, passed: bool, violations: usize) {
    info!(
        event = "gate.evaluated",
        run_id = %run_id,
        passed = passed,
        violations = violations,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        // Just ensure RunSpan::enter doesn't panic
        let _span = RunSpan::enter("test-run-id");
    }
}
