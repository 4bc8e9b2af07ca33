//! regsync - register table synchronization for iRock Modbus BMS devices.
//!
//! ## Commands
//!
//! - `sync`: fetch upstream releases, regenerate the register tables, commit
//! - `check`: validate a local release manifest
//! - `render`: build the register module from local manifests
//! - `provision`: install the driver bundle onto a Venus OS device
//! - `runs`: inspect recorded sync runs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use regsync_core::{
    capture_head_sha, codegen, compile_manifest, domain::validation, CatalogEntry, FsRunLedger,
    RegisterCatalog, RunId, RunLedger,
};
use regsync_pipeline::{StageStatus, SyncGate, SyncOptions, SyncOutcome, SyncPipeline, SyncSpec};
use regsync_provision::{ProvisionPlan, Provisioner};
use regsync_upstream::{UpstreamClient, UpstreamConfig};

#[derive(Parser)]
#[command(name = "regsync")]
#[command(author = "iRock Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release-driven register table synchronization", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch upstream releases, regenerate the register tables, and commit
    Sync {
        /// Git work tree holding the generated file (default: current directory)
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Upstream repository owner
        #[arg(long, default_value = "Arvernus")]
        owner: String,

        /// Upstream repository name
        #[arg(long, default_value = "iRock-Modbus")]
        repo: String,

        /// Manifest file name inside each release
        #[arg(long, default_value = "data.yaml")]
        manifest: String,

        /// Target file, relative to the workspace
        #[arg(short, long, default_value = "bms/registers.rs")]
        target: PathBuf,

        /// Render only; write and commit nothing
        #[arg(long)]
        dry_run: bool,

        /// Include releases marked as prereleases
        #[arg(long)]
        include_prereleases: bool,

        /// Keep only the newest N releases
        #[arg(long)]
        max_releases: Option<usize>,

        /// Commit message for the generated file
        #[arg(short, long)]
        message: Option<String>,

        /// Run ledger directory (default: <workspace>/.regsync/runs)
        #[arg(long)]
        runs_dir: Option<PathBuf>,
    },

    /// Parse and validate a local release manifest
    Check {
        /// Manifest file (data.yaml)
        manifest: PathBuf,
    },

    /// Build the register module from local manifest files
    Render {
        /// Manifest files, one per protocol version
        manifests: Vec<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Install the driver bundle onto a Venus OS device
    Provision {
        /// Bundled archive to extract
        #[arg(long, default_value = "./venus-data.tar.gz")]
        archive: PathBuf,

        /// Directory the archive is extracted into
        #[arg(long, default_value = "/data")]
        install_root: PathBuf,

        /// Second-stage installer script
        #[arg(long, default_value = "/data/etc/dbus-serialbattery/reinstall-local.sh")]
        installer: PathBuf,

        /// Packages to install (defaults to the driver's two requirements)
        #[arg(long = "package")]
        packages: Vec<String>,

        /// Print the planned commands without executing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect recorded sync runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
}

#[derive(Subcommand)]
enum RunsAction {
    /// List recorded runs, newest first
    List {
        /// Run ledger directory
        #[arg(long, default_value = ".regsync/runs")]
        runs_dir: PathBuf,
    },

    /// Show one run's record and events
    Show {
        /// Run id
        id: String,

        /// Run ledger directory
        #[arg(long, default_value = ".regsync/runs")]
        runs_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    regsync_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Sync {
            workspace,
            owner,
            repo,
            manifest,
            target,
            dry_run,
            include_prereleases,
            max_releases,
            message,
            runs_dir,
        } => {
            cmd_sync(
                workspace,
                &owner,
                &repo,
                &manifest,
                target,
                dry_run,
                include_prereleases,
                max_releases,
                message,
                runs_dir,
            )
            .await
        }
        Commands::Check { manifest } => cmd_check(&manifest),
        Commands::Render { manifests, output } => cmd_render(&manifests, output.as_deref()),
        Commands::Provision {
            archive,
            install_root,
            installer,
            packages,
            dry_run,
        } => cmd_provision(archive, install_root, installer, packages, dry_run).await,
        Commands::Runs { action } => match action {
            RunsAction::List { runs_dir } => cmd_runs_list(&runs_dir).await,
            RunsAction::Show { id, runs_dir } => cmd_runs_show(&id, &runs_dir).await,
        },
    }
}

/// Run the full sync pipeline against an upstream repository
#[allow(clippy::too_many_arguments)]
async fn cmd_sync(
    workspace: PathBuf,
    owner: &str,
    repo: &str,
    manifest: &str,
    target: PathBuf,
    dry_run: bool,
    include_prereleases: bool,
    max_releases: Option<usize>,
    message: Option<String>,
    runs_dir: Option<PathBuf>,
) -> Result<()> {
    if !regsync_core::is_git_repo(&workspace) {
        anyhow::bail!("{} is not inside a git work tree", workspace.display());
    }
    let git_sha = capture_head_sha(&workspace).context("capturing workspace HEAD")?;

    let config = UpstreamConfig::new(owner, repo).with_manifest_path(manifest);
    let client = Arc::new(UpstreamClient::new(config).context("building upstream client")?);

    let runs_dir = runs_dir.unwrap_or_else(|| workspace.join(".regsync/runs"));
    let ledger = Arc::new(FsRunLedger::new(&runs_dir).context("opening run ledger")?);

    let spec = SyncSpec::new(
        workspace,
        format!("{owner}/{repo}"),
        manifest.to_string(),
        target.clone(),
        git_sha.clone(),
    );

    let mut options = SyncOptions {
        dry_run,
        include_prereleases,
        max_releases,
        ..SyncOptions::default()
    };
    if let Some(message) = message {
        options.commit_message = message;
    }

    println!("Syncing register tables from {owner}/{repo}");
    println!("Git SHA: {git_sha}");
    println!();

    let result = SyncPipeline::run(ledger.clone(), client, &spec, &options)
        .await
        .context("sync pipeline failed to run")?;

    println!("Run ID: {}", result.run_id);
    println!(
        "Status: {}",
        if result.success { "✓ PASSED" } else { "✗ FAILED" }
    );
    println!("Duration: {}ms", result.duration_ms);
    println!();

    for stage in &result.stages {
        let symbol = match stage.status {
            StageStatus::Passed => "✓",
            StageStatus::Failed => "✗",
            StageStatus::Skipped => "-",
        };
        println!(
            "  {} {} ({}ms): {}",
            symbol,
            stage.stage.name(),
            stage.duration_ms,
            stage.detail
        );
    }
    println!();

    match &result.outcome {
        Some(SyncOutcome::Committed { sha }) => println!("Committed {sha}"),
        Some(SyncOutcome::NoChange) => println!("Register tables already up to date"),
        Some(SyncOutcome::DryRun { changed: true }) => {
            println!("Dry run: register tables would change")
        }
        Some(SyncOutcome::DryRun { changed: false }) => {
            println!("Dry run: register tables already up to date")
        }
        None => {}
    }

    // Re-derive the verdict from the recorded events.
    let events = ledger.get_events(&RunId(result.run_id.clone())).await?;
    let verdict = SyncGate::evaluate(&events, &target.to_string_lossy());
    regsync_core::emit_gate_evaluated(&result.run_id, verdict.passed, verdict.violations.len());
    println!("Gate: {}", if verdict.passed { "✓ PASSED" } else { "✗ FAILED" });
    if !verdict.violations.is_empty() {
        println!("Violations:");
        for violation in &verdict.violations {
            println!("  - {violation}");
        }
    }

    if result.success && verdict.passed {
        Ok(())
    } else {
        anyhow::bail!("sync failed")
    }
}

/// Validate a local manifest and print its summary
fn cmd_check(manifest: &PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(manifest)
        .with_context(|| format!("reading {}", manifest.display()))?;
    let entry = compile_manifest(&text)
        .with_context(|| format!("validating {}", manifest.display()))?;

    println!("{}", manifest_summary(&entry));
    println!("OK");
    Ok(())
}

/// One-line-per-fact summary of a compiled manifest
fn manifest_summary(entry: &CatalogEntry) -> String {
    let mut out = format!(
        "modbus version: {}\nregisters: {} (words 0..{})",
        entry.map.version,
        entry.map.registers.len(),
        entry.map.max_end(),
    );
    match &entry.cells {
        Some(cells) => {
            out.push_str(&format!(
                "\ncell frame: base {}, {} words/cell, {} registers",
                cells.base,
                cells.stride,
                cells.registers.len()
            ));
        }
        None => out.push_str("\ncell frame: none"),
    }
    out
}

/// Build the register module from local manifests
fn cmd_render(manifests: &[PathBuf], output: Option<&std::path::Path>) -> Result<()> {
    if manifests.is_empty() {
        anyhow::bail!("at least one manifest file is required");
    }

    let mut maps = Vec::new();
    let mut cell_maps = Vec::new();
    for path in manifests {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let entry =
            compile_manifest(&text).with_context(|| format!("validating {}", path.display()))?;
        maps.push(entry.map);
        if let Some(cells) = entry.cells {
            cell_maps.push(cells);
        }
    }

    let catalog = RegisterCatalog::new(maps, cell_maps);
    validation::validate_catalog(&catalog)?;

    let rendered = codegen::render_into(
        None,
        &catalog,
        &codegen::CodegenOptions::default(),
        &output
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<stdout>".to_string()),
    )?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered.text)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} ({} maps)", path.display(), catalog.maps.len());
        }
        None => println!("{}", rendered.text),
    }
    Ok(())
}

/// Provision a Venus OS device
async fn cmd_provision(
    archive: PathBuf,
    install_root: PathBuf,
    installer: PathBuf,
    packages: Vec<String>,
    dry_run: bool,
) -> Result<()> {
    let mut plan = ProvisionPlan {
        archive,
        install_root,
        installer,
        ..ProvisionPlan::default()
    };
    if !packages.is_empty() {
        plan.packages = packages;
    }

    if !dry_run && !regsync_provision::is_opkg_available() {
        anyhow::bail!("opkg is not available; is this a Venus OS device?");
    }

    let provisioner = Provisioner::new(plan);
    let report = provisioner
        .execute(dry_run)
        .await
        .context("provisioning failed to run")?;

    for step in &report.steps {
        if !step.executed {
            println!("  would run: {}", step.step.display());
        } else if step.success {
            println!("  ✓ {} ({}ms)", step.step.display(), step.duration_ms);
        } else {
            println!(
                "  ✗ {} (exit code {})\n{}",
                step.step.display(),
                step.exit_code,
                step.stderr.trim_end()
            );
        }
    }

    if report.success {
        Ok(())
    } else {
        anyhow::bail!("provisioning aborted at the first failing step")
    }
}

/// List recorded sync runs
async fn cmd_runs_list(runs_dir: &PathBuf) -> Result<()> {
    let ledger = FsRunLedger::new(runs_dir).context("opening run ledger")?;
    let runs = ledger.list_runs().await?;

    if runs.is_empty() {
        println!("No recorded runs in {}", runs_dir.display());
        return Ok(());
    }

    for run in runs {
        let commit = run
            .summary
            .as_ref()
            .and_then(|s| s.commit_sha.as_deref().map(|sha| &sha[..12.min(sha.len())]))
            .unwrap_or("-");
        println!(
            "{} {} {} {} commit:{}",
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.run_id,
            run.status,
            run.metadata.job_name,
            commit
        );
    }
    Ok(())
}

/// Show one run's record and events
async fn cmd_runs_show(id: &str, runs_dir: &PathBuf) -> Result<()> {
    let ledger = FsRunLedger::new(runs_dir).context("opening run ledger")?;
    let run_id = RunId(id.to_string());

    let record = ledger
        .get_run(&run_id)
        .await
        .with_context(|| format!("run not found: {id}"))?;

    println!("Run:     {}", record.run_id);
    println!("Job:     {}", record.metadata.job_name);
    println!("Status:  {}", record.status);
    println!("Created: {}", record.created_at.to_rfc3339());
    if let Some(summary) = &record.summary {
        println!(
            "Summary: {} events, {}ms, success={}",
            summary.total_events, summary.duration_ms, summary.success
        );
        if let Some(sha) = &summary.commit_sha {
            println!("Commit:  {sha}");
        }
    }
    println!();

    for event in ledger.get_events(&run_id).await? {
        println!(
            "[{}] {} {}",
            event.seq,
            event.kind,
            serde_json::to_string(&event.payload)?
        );
    }
    Ok(())
}
