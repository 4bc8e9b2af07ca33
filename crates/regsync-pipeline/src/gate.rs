//! Gate evaluation over a recorded sync run.

use regsync_core::RunEvent;
use serde::{Deserialize, Serialize};

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Violations that caused failure (empty if passed).
    pub violations: Vec<String>,

    /// Summary message.
    pub message: String,
}

/// Sync gate evaluation rules.
pub struct SyncGate;

impl SyncGate {
    /// Evaluate a run's event log.
    ///
    /// Gate rules:
    /// - Every `stage_started` must be followed by `stage_completed`,
    ///   `stage_skipped`, or `stage_failed` for the same stage.
    /// - Any `stage_failed` event is a violation.
    /// - A `commit_created` event may only list the declared target file.
    pub fn evaluate(events: &[RunEvent], declared_target: &str) -> GateVerdict {
        let mut violations = Vec::new();

        let mut started = std::collections::HashSet::new();
        let mut finished = std::collections::HashSet::new();

        for event in events {
            let stage = event.payload["stage"].as_str().unwrap_or("unknown").to_string();
            match event.kind.as_str() {
                "stage_started" => {
                    started.insert(stage);
                }
                "stage_completed" | "stage_skipped" => {
                    finished.insert(stage);
                }
                "stage_failed" => {
                    let error = event.payload["error"].as_str().unwrap_or("unknown error");
                    violations.push(format!("stage '{stage}' failed: {error}"));
                    finished.insert(stage);
                }
                "commit_created" => {
                    finished.insert(stage);
                    let paths: Vec<&str> = event.payload["paths"]
                        .as_array()
                        .map(|a| a.iter().filter_map(|p| p.as_str()).collect())
                        .unwrap_or_default();
                    for path in &paths {
                        if *path != declared_target {
                            violations.push(format!(
                                "commit touched undeclared path: {path} (declared: {declared_target})"
                            ));
                        }
                    }
                    if paths.is_empty() {
                        violations.push("commit event carries no paths".to_string());
                    }
                }
                _ => {}
            }
        }

        for stage in &started {
            if !finished.contains(stage) {
                violations.push(format!("stage '{stage}' was started but never finished"));
            }
        }

        let passed = violations.is_empty();
        let message = if passed {
            "All stages accounted for".to_string()
        } else {
            format!("Gate failed with {} violation(s)", violations.len())
        };

        GateVerdict {
            passed,
            violations,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(seq: u64, kind: &str, payload: serde_json::Value) -> RunEvent {
        RunEvent::new(seq, kind, payload)
    }

    #[test]
    fn test_empty_events_passes() {
        let verdict = SyncGate::evaluate(&[], "bms/registers.rs");
        assert!(verdict.passed);
    }

    #[test]
    fn test_clean_run_passes() {
        let events = vec![
            event(1, "stage_started", json!({"stage": "render"})),
            event(2, "stage_completed", json!({"stage": "render"})),
            event(3, "stage_started", json!({"stage": "commit"})),
            event(
                4,
                "commit_created",
                json!({"stage": "commit", "sha": "abc", "paths": ["bms/registers.rs"]}),
            ),
        ];
        let verdict = SyncGate::evaluate(&events, "bms/registers.rs");
        assert!(verdict.passed, "violations: {:?}", verdict.violations);
    }

    #[test]
    fn test_failed_stage_violates() {
        let events = vec![
            event(1, "stage_started", json!({"stage": "validate"})),
            event(
                2,
                "stage_failed",
                json!({"stage": "validate", "error": "registers overlap"}),
            ),
        ];
        let verdict = SyncGate::evaluate(&events, "bms/registers.rs");
        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("registers overlap"));
    }

    #[test]
    fn test_unfinished_stage_violates() {
        let events = vec![event(1, "stage_started", json!({"stage": "render"}))];
        let verdict = SyncGate::evaluate(&events, "bms/registers.rs");
        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("never finished"));
    }

    #[test]
    fn test_commit_outside_target_violates() {
        let events = vec![
            event(1, "stage_started", json!({"stage": "commit"})),
            event(
                2,
                "commit_created",
                json!({"stage": "commit", "sha": "abc", "paths": ["bms/registers.rs", "src/lib.rs"]}),
            ),
        ];
        let verdict = SyncGate::evaluate(&events, "bms/registers.rs");
        assert!(!verdict.passed);
        assert!(verdict.violations[0].contains("src/lib.rs"));
    }

    #[test]
    fn test_skipped_commit_passes() {
        let events = vec![
            event(1, "stage_started", json!({"stage": "commit"})),
            event(
                2,
                "stage_skipped",
                json!({"stage": "commit", "reason": "no changes"}),
            ),
        ];
        let verdict = SyncGate::evaluate(&events, "bms/registers.rs");
        assert!(verdict.passed);
    }
}
