//! Sequential execution of a provisioning plan.
//!
//! Steps run strictly in order and execution stops at the first failure;
//! there is no retry or rollback. A failed device install is re-run from
//! the top after the operator fixes the cause.

use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{ProvisionError, Result};
use crate::plan::{ProvisionPlan, ProvisionStep, StepKind};

/// Result of one executed (or planned) step.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// The step this result belongs to.
    pub step: ProvisionStep,

    /// Exit code (0 = success). -1 when the process had no exit code.
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,

    /// False for dry-run results: the command was only planned.
    pub executed: bool,
}

impl StepResult {
    fn planned(step: ProvisionStep) -> Self {
        Self {
            step,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            success: true,
            executed: false,
        }
    }
}

/// Outcome of a provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    /// Per-step results, in execution order. Stops at the first failure.
    pub steps: Vec<StepResult>,

    /// Whether every executed step succeeded.
    pub success: bool,
}

/// Executes a provisioning plan.
pub struct Provisioner {
    plan: ProvisionPlan,

    /// Per-step timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
}

impl Provisioner {
    /// Create a provisioner with the default 600 second step timeout.
    pub fn new(plan: ProvisionPlan) -> Self {
        Self {
            plan,
            timeout_secs: 600,
        }
    }

    /// Access the plan.
    pub fn plan(&self) -> &ProvisionPlan {
        &self.plan
    }

    /// Execute the plan sequentially, stopping at the first failed step.
    ///
    /// With `dry_run` the planned commands are returned without running
    /// anything. The archive existence check still applies: a dry run
    /// against a missing archive is reported before any device would be
    /// touched.
    pub async fn execute(&self, dry_run: bool) -> Result<ProvisionReport> {
        if !self.plan.archive.exists() {
            return Err(ProvisionError::ArchiveMissing(
                self.plan.archive.to_string_lossy().into_owned(),
            ));
        }

        let mut results = Vec::new();
        let mut success = true;

        for step in self.plan.steps() {
            if dry_run {
                info!(command = %step.display(), "dry run: would execute");
                results.push(StepResult::planned(step));
                continue;
            }

            info!(kind = ?step.kind, command = %step.display(), "executing step");
            let result = self.execute_step(&step).await?;
            let passed = result.success;
            if !passed {
                warn!(
                    command = %step.display(),
                    exit_code = result.exit_code,
                    "provisioning step failed, aborting"
                );
            }
            results.push(result);
            if !passed {
                success = false;
                break;
            }
        }

        Ok(ProvisionReport {
            steps: results,
            success,
        })
    }

    async fn execute_step(&self, step: &ProvisionStep) -> Result<StepResult> {
        let start = Instant::now();

        let exe = &step.command[0];
        let args = &step.command[1..];

        let child = Command::new(exe)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProvisionError::SpawnFailed {
                command: step.display(),
                reason: e.to_string(),
            })?;

        let output = if self.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| ProvisionError::Timeout {
                step: format!("{:?}", step.kind),
                timeout_secs: self.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(StepResult {
            step: step.clone(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
            executed: true,
        })
    }
}

/// Check whether opkg is available on this system.
pub fn is_opkg_available() -> bool {
    std::process::Command::new("opkg")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn plan_with_archive(dir: &std::path::Path) -> ProvisionPlan {
        let archive = dir.join("venus-data.tar.gz");
        std::fs::write(&archive, b"not a real tarball").unwrap();
        ProvisionPlan {
            archive,
            ..ProvisionPlan::default()
        }
    }

    #[tokio::test]
    async fn test_missing_archive_rejected_before_any_step() {
        let plan = ProvisionPlan {
            archive: PathBuf::from("/nonexistent/venus-data.tar.gz"),
            ..ProvisionPlan::default()
        };
        let err = Provisioner::new(plan).execute(true).await.unwrap_err();
        assert!(matches!(err, ProvisionError::ArchiveMissing(_)));
    }

    #[tokio::test]
    async fn test_dry_run_plans_all_steps_without_executing() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_with_archive(dir.path());

        let report = Provisioner::new(plan).execute(true).await.unwrap();
        assert!(report.success);
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps.iter().all(|s| !s.executed));
    }

    #[tokio::test]
    async fn test_execute_step_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::new(plan_with_archive(dir.path()));

        let step = ProvisionStep {
            kind: StepKind::RunInstaller,
            command: vec!["echo".to_string(), "hello".to_string()],
        };
        let result = provisioner.execute_step(&step).await.unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("hello"));
        assert!(result.executed);
    }

    #[tokio::test]
    async fn test_execute_step_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::new(plan_with_archive(dir.path()));

        let step = ProvisionStep {
            kind: StepKind::RunInstaller,
            command: vec!["false".to_string()],
        };
        let result = provisioner.execute_step(&step).await.unwrap();
        assert!(!result.success);
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = Provisioner::new(plan_with_archive(dir.path()));

        let step = ProvisionStep {
            kind: StepKind::RunInstaller,
            command: vec!["/nonexistent-binary-that-does-not-exist".to_string()],
        };
        let err = provisioner.execute_step(&step).await.unwrap_err();
        assert!(matches!(err, ProvisionError::SpawnFailed { .. }));
    }
}
