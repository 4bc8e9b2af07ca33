//! Sync pipeline orchestration and run recording.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use regsync_core::codegen::{self, CodegenOptions};
use regsync_core::domain::validation;
use regsync_core::{
    compile_manifest, git, obs, RegisterCatalog, RunEvent, RunId, RunLedger, RunMetadata,
    RunSummary,
};
use regsync_upstream::{Release, ReleaseSource};

use crate::spec::SyncSpec;
use crate::stage::{StageOutcome, StageStatus, SyncOptions, SyncStage};

/// Terminal outcome of a successful sync run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SyncOutcome {
    /// The generated file changed and was committed.
    Committed { sha: String },

    /// Upstream matched the work tree; nothing to commit.
    NoChange,

    /// Dry run: rendered only, nothing written or committed.
    DryRun { changed: bool },
}

/// Result of a complete sync pipeline execution.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Ledger run id.
    pub run_id: String,

    /// Whether every stage passed or was legitimately skipped.
    pub success: bool,

    /// Results of individual stages.
    pub stages: Vec<StageOutcome>,

    /// Terminal outcome; `None` when the run failed.
    pub outcome: Option<SyncOutcome>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the sync specification.
    pub spec_digest: String,
}

impl PipelineResult {
    /// Number of stages that did not fail.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }
}

/// Release selection counters, folded into the fetch stage's detail.
#[derive(Debug, Default, Clone)]
pub(crate) struct SelectionStats {
    pub total: usize,
    pub drafts: usize,
    pub prereleases: usize,
    pub bad_tags: usize,
}

/// Order and filter the upstream release list.
///
/// Drafts never participate; prereleases only on request; tags that are not
/// semantic versions are skipped with a warning (upstream has shipped
/// non-release tags before). The survivors are ordered newest first.
pub(crate) fn select_releases(
    releases: Vec<Release>,
    include_prereleases: bool,
    max_releases: Option<usize>,
) -> (Vec<(Version, Release)>, SelectionStats) {
    let mut stats = SelectionStats {
        total: releases.len(),
        ..Default::default()
    };

    let mut selected: Vec<(Version, Release)> = Vec::new();
    for release in releases {
        if release.draft {
            stats.drafts += 1;
            continue;
        }
        if release.prerelease && !include_prereleases {
            stats.prereleases += 1;
            continue;
        }
        match release.version() {
            Ok(version) => selected.push((version, release)),
            Err(_) => {
                warn!(tag = %release.tag_name, "skipping release with non-semver tag");
                stats.bad_tags += 1;
            }
        }
    }

    selected.sort_by(|a, b| b.0.cmp(&a.0));
    if let Some(max) = max_releases {
        selected.truncate(max);
    }

    (selected, stats)
}

fn write_target(path: &std::path::Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

struct Recorder {
    ledger: Arc<dyn RunLedger>,
    run_id: RunId,
    seq: u64,
}

impl Recorder {
    async fn record(&mut self, kind: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        self.ledger
            .append_event(&self.run_id, RunEvent::new(self.seq, kind, payload))
            .await?;
        self.seq += 1;
        Ok(())
    }
}

/// Sync pipeline orchestrator.
pub struct SyncPipeline;

impl SyncPipeline {
    /// Execute a sync run and record all events into the ledger.
    ///
    /// Each stage produces a `stage_started` event followed by
    /// `stage_completed`, `stage_skipped`, or `stage_failed`. A commit adds
    /// a `commit_created` event carrying the SHA and the staged paths. The
    /// run is finalized as Completed or Failed.
    pub async fn run(
        ledger: Arc<dyn RunLedger>,
        source: Arc<dyn ReleaseSource>,
        spec: &SyncSpec,
        options: &SyncOptions,
    ) -> anyhow::Result<PipelineResult> {
        let start = Instant::now();
        let spec_digest = spec.digest();

        let metadata = RunMetadata {
            git_sha: Some(spec.git_sha.clone()),
            job_name: spec.job_name(),
            tags: json!({
                "upstream": spec.repo_slug,
                "manifest": spec.manifest_path,
                "target": spec.target_file.to_string_lossy(),
                "dry_run": options.dry_run,
            }),
        };
        let run_id = ledger.create_run(&spec_digest, metadata).await?;
        let _span = obs::RunSpan::enter(&run_id.0);
        obs::emit_sync_started(&run_id.0, &spec.job_name());
        info!(run_id = %run_id, upstream = %spec.repo_slug, "starting sync pipeline");

        let mut recorder = Recorder {
            ledger: ledger.clone(),
            run_id: run_id.clone(),
            seq: 1,
        };
        let mut stages: Vec<StageOutcome> = Vec::new();

        // Records start/end events around a stage body; a failing body
        // finalizes the run and returns early with the failure result.
        macro_rules! run_stage {
            ($stage:expr, $body:expr) => {{
                let stage = $stage;
                let stage_start = Instant::now();
                recorder
                    .record("stage_started", json!({ "stage": stage.name() }))
                    .await?;
                obs::emit_stage_started(&recorder.run_id.0, stage.name());

                let body: anyhow::Result<_> = $body;
                match body {
                    Ok((value, detail)) => {
                        let duration_ms = stage_start.elapsed().as_millis() as u64;
                        recorder
                            .record(
                                "stage_completed",
                                json!({
                                    "stage": stage.name(),
                                    "detail": &detail,
                                    "duration_ms": duration_ms,
                                }),
                            )
                            .await?;
                        obs::emit_stage_finished(&recorder.run_id.0, stage.name(), true, duration_ms);
                        stages.push(StageOutcome {
                            stage,
                            status: StageStatus::Passed,
                            detail,
                            duration_ms,
                        });
                        value
                    }
                    Err(error) => {
                        return Self::fail_stage(
                            recorder,
                            stages,
                            stage,
                            stage_start,
                            error,
                            start,
                            spec_digest,
                        )
                        .await;
                    }
                }
            }};
        }

        // Stage 1: fetch and select releases.
        let selected = run_stage!(SyncStage::FetchReleases, {
            match source.list_releases().await {
                Ok(releases) => {
                    let (selected, stats) =
                        select_releases(releases, options.include_prereleases, options.max_releases);
                    let detail = format!("{} of {} releases selected", selected.len(), stats.total);
                    Ok((selected, detail))
                }
                Err(e) => Err(anyhow::Error::from(e).context("listing upstream releases")),
            }
        });

        // Stage 2: fetch each release's manifest.
        let manifests = run_stage!(SyncStage::FetchManifests, {
            let mut manifests: Vec<(String, String)> = Vec::new();
            let mut failed: Option<anyhow::Error> = None;
            for (_, release) in &selected {
                match source.fetch_manifest(release).await {
                    Ok(text) => manifests.push((release.tag_name.clone(), text)),
                    Err(e) => {
                        failed = Some(anyhow::Error::from(e).context(format!(
                            "fetching manifest for release {}",
                            release.tag_name
                        )));
                        break;
                    }
                }
            }
            match failed {
                Some(e) => Err(e),
                None => {
                    let detail = format!("{} manifests fetched", manifests.len());
                    Ok((manifests, detail))
                }
            }
        });

        // Stage 3: parse, validate, and assemble the catalog.
        let catalog = run_stage!(SyncStage::Validate, {
            (|| {
                let mut maps = Vec::new();
                let mut cell_maps = Vec::new();
                for (tag, text) in &manifests {
                    let entry = compile_manifest(text)
                        .with_context(|| format!("manifest of release {tag}"))?;
                    maps.push(entry.map);
                    if let Some(cells) = entry.cells {
                        cell_maps.push(cells);
                    }
                }
                let catalog = RegisterCatalog::new(maps, cell_maps);
                validation::validate_catalog(&catalog)?;
                let detail = format!(
                    "{} register maps, {} cell maps",
                    catalog.maps.len(),
                    catalog.cell_maps.len()
                );
                Ok((catalog, detail))
            })()
        });

        // Stage 4: render the module against the current target content.
        let target_abs = spec.workspace.join(&spec.target_file);
        let rendered = run_stage!(SyncStage::Render, {
            (|| {
                let existing = match std::fs::read_to_string(&target_abs) {
                    Ok(text) => Some(text),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(anyhow::Error::from(e)),
                };
                let rendered = codegen::render_into(
                    existing.as_deref(),
                    &catalog,
                    &CodegenOptions::default(),
                    &spec.target_file.to_string_lossy(),
                )?;
                let detail = if rendered.changed {
                    "content changed".to_string()
                } else {
                    "up to date".to_string()
                };
                Ok((rendered, detail))
            })()
        });

        // Stage 5: commit the target file, or record why not.
        let stage = SyncStage::Commit;
        let stage_start = Instant::now();
        recorder
            .record("stage_started", json!({ "stage": stage.name() }))
            .await?;
        obs::emit_stage_started(&recorder.run_id.0, stage.name());

        let (outcome, status, detail) = if options.dry_run {
            recorder
                .record(
                    "stage_skipped",
                    json!({ "stage": stage.name(), "reason": "dry run" }),
                )
                .await?;
            (
                SyncOutcome::DryRun {
                    changed: rendered.changed,
                },
                StageStatus::Skipped,
                "dry run".to_string(),
            )
        } else {
            if rendered.changed {
                if let Err(e) = write_target(&target_abs, &rendered.text) {
                    return Self::fail_stage(
                        recorder,
                        stages,
                        stage,
                        stage_start,
                        e.context(format!("writing {}", target_abs.display())),
                        start,
                        spec_digest,
                    )
                    .await;
                }
            }

            let commit = git::commit_paths(
                &spec.workspace,
                &[spec.target_file.as_path()],
                &options.commit_message,
            );
            match commit {
                Ok(Some(sha)) => {
                    recorder
                        .record(
                            "commit_created",
                            json!({
                                "stage": stage.name(),
                                "sha": sha,
                                "paths": [spec.target_file.to_string_lossy()],
                            }),
                        )
                        .await?;
                    obs::emit_commit_created(&recorder.run_id.0, &sha);
                    let detail = format!("commit {}", &sha[..12.min(sha.len())]);
                    (SyncOutcome::Committed { sha }, StageStatus::Passed, detail)
                }
                Ok(None) => {
                    recorder
                        .record(
                            "stage_skipped",
                            json!({ "stage": stage.name(), "reason": "no changes" }),
                        )
                        .await?;
                    (SyncOutcome::NoChange, StageStatus::Skipped, "no changes".to_string())
                }
                Err(e) => {
                    return Self::fail_stage(
                        recorder,
                        stages,
                        stage,
                        stage_start,
                        anyhow::Error::from(e).context("committing generated file"),
                        start,
                        spec_digest,
                    )
                    .await;
                }
            }
        };

        let stage_duration = stage_start.elapsed().as_millis() as u64;
        obs::emit_stage_finished(&recorder.run_id.0, stage.name(), true, stage_duration);
        stages.push(StageOutcome {
            stage,
            status,
            detail,
            duration_ms: stage_duration,
        });

        // Finalize.
        let duration_ms = start.elapsed().as_millis() as u64;
        let total_events = recorder.seq - 1;
        let commit_sha = match &outcome {
            SyncOutcome::Committed { sha } => Some(sha.clone()),
            _ => None,
        };
        let summary = RunSummary {
            total_events,
            duration_ms,
            success: true,
            commit_sha,
        };
        ledger.complete_run(&run_id, summary).await?;
        obs::emit_sync_finished(&run_id.0, duration_ms, total_events, true);
        info!(run_id = %run_id, ?outcome, "sync pipeline completed");

        Ok(PipelineResult {
            run_id: run_id.0,
            success: true,
            stages,
            outcome: Some(outcome),
            duration_ms,
            spec_digest,
        })
    }

    async fn fail_stage(
        mut recorder: Recorder,
        mut stages: Vec<StageOutcome>,
        stage: SyncStage,
        stage_start: Instant,
        error: anyhow::Error,
        run_start: Instant,
        spec_digest: String,
    ) -> anyhow::Result<PipelineResult> {
        let duration_ms = stage_start.elapsed().as_millis() as u64;
        recorder
            .record(
                "stage_failed",
                json!({
                    "stage": stage.name(),
                    "error": format!("{error:#}"),
                    "duration_ms": duration_ms,
                }),
            )
            .await?;
        obs::emit_stage_finished(&recorder.run_id.0, stage.name(), false, duration_ms);
        stages.push(StageOutcome {
            stage,
            status: StageStatus::Failed,
            detail: format!("{error:#}"),
            duration_ms,
        });

        let run_duration = run_start.elapsed().as_millis() as u64;
        let total_events = recorder.seq - 1;
        let summary = RunSummary {
            total_events,
            duration_ms: run_duration,
            success: false,
            commit_sha: None,
        };
        recorder.ledger.fail_run(&recorder.run_id, summary).await?;
        obs::emit_sync_finished(&recorder.run_id.0, run_duration, total_events, false);
        info!(run_id = %recorder.run_id, stage = stage.name(), "sync pipeline failed");

        Ok(PipelineResult {
            run_id: recorder.run_id.0.clone(),
            success: false,
            stages,
            outcome: None,
            duration_ms: run_duration,
            spec_digest,
        })
    }
}
