//! Sync command - Mirror a local path into the namespace
//!
//! Provides the `zkmirror sync <SOURCE> <DESTINATION>` CLI command which:
//! 1. Loads configuration and applies command-line overrides
//! 2. Opens the namespace snapshot (empty if it does not exist yet)
//! 3. Runs the MirrorEngine over the source
//! 4. Saves the snapshot and displays results

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use zkmirror_core::config::Config;
use zkmirror_core::domain::{NodePath, SyncFailures};
use zkmirror_store::{MemoryCoordinationStore, StoreStats};
use zkmirror_sync::{MirrorEngine, MirrorReport, SyncRequest};

use super::{parse_node_path, CliContext, EXIT_INVALID_CONFIG};
use crate::output::{plural, OutputFormatter};

/// Sync command with clap options
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Local file or directory to mirror
    pub source: PathBuf,

    /// Existing node the source is mirrored under, e.g. `/app`
    #[arg(value_parser = parse_node_path)]
    pub destination: NodePath,

    /// Namespace snapshot to load and save (overrides store.snapshot)
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Maximum node writes in flight, 0 for unbounded
    #[arg(long, value_name = "N")]
    pub max_concurrent_writes: Option<u32>,

    /// Mirror symlinked files and directories as their targets
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Create the destination node and its ancestors if missing
    #[arg(long)]
    pub create_prefix: bool,
}

/// Everything a finished `sync` run reports
#[derive(Debug)]
pub struct SyncOutcome {
    pub report: MirrorReport,
    pub stats: StoreStats,
    pub snapshot: PathBuf,
    /// Prefix nodes created by `--create-prefix`
    pub prefix_created: usize,
}

impl SyncCommand {
    /// Execute the sync command
    pub async fn execute(&self, ctx: &CliContext) -> Result<ExitCode> {
        let formatter = ctx.formatter();
        let config = match self.resolve_config(ctx) {
            Ok(config) => config,
            Err(errors) => {
                for err in &errors {
                    formatter.error(err);
                }
                return Ok(ExitCode::from(EXIT_INVALID_CONFIG));
            }
        };

        info!(
            config_path = %ctx.config_path.display(),
            snapshot = %config.store.snapshot.display(),
            "Loaded configuration"
        );

        let outcome = self.run(&config).await?;

        if ctx.is_json() {
            formatter.print_json(&outcome_json(&outcome));
        } else {
            print_human(formatter.as_ref(), &outcome);
        }

        Ok(if outcome.report.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    /// Loads the configuration file, applies overrides and validates the result
    ///
    /// Errors are the messages to report; the run must not start with them.
    fn resolve_config(&self, ctx: &CliContext) -> std::result::Result<Config, Vec<String>> {
        let config = ctx.load_config().map_err(|e| vec![format!("{e:#}")])?;
        let config = self.effective_config(config);
        let errors: Vec<String> = config.validate().iter().map(ToString::to_string).collect();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }

    /// Configuration with this command's flags applied on top
    fn effective_config(&self, mut config: Config) -> Config {
        if let Some(snapshot) = &self.snapshot {
            config.store.snapshot = snapshot.clone();
        }
        if let Some(limit) = self.max_concurrent_writes {
            config.sync.max_concurrent_writes = limit;
        }
        if self.follow_symlinks {
            config.sync.follow_symlinks = true;
        }
        config
    }

    /// Loads the snapshot, mirrors the source and saves the snapshot back
    ///
    /// Sync failures are part of the outcome; only snapshot I/O is an error.
    pub async fn run(&self, config: &Config) -> Result<SyncOutcome> {
        let snapshot = config.store.snapshot.clone();
        let store = MemoryCoordinationStore::load_or_empty(&snapshot)
            .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?
            .with_latency(Duration::from_millis(config.store.latency_ms));
        let store = Arc::new(store);

        let prefix_created = if self.create_prefix {
            store.ensure_path(&self.destination)
        } else {
            0
        };

        let engine = MirrorEngine::with_local_filesystem(store.clone(), config);
        let request = SyncRequest::new(resolve_source(&self.source), self.destination.clone());
        let report = engine.mirror(request).await;

        store
            .save(&snapshot)
            .with_context(|| format!("Failed to save snapshot {}", snapshot.display()))?;

        Ok(SyncOutcome {
            report,
            stats: store.stats(),
            snapshot,
            prefix_created,
        })
    }
}

/// Sources like `.` or `..` have no base name until resolved
fn resolve_source(source: &Path) -> PathBuf {
    if source.file_name().is_some() {
        return source.to_path_buf();
    }
    std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf())
}

fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms >= 1000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        format!("{}ms", ms)
    }
}

fn failures_json(failures: &SyncFailures) -> serde_json::Value {
    failures
        .iter()
        .map(|(path, error)| {
            serde_json::json!({
                "path": path.as_str(),
                "error": error.to_string(),
                "status": error.status().map(|code| code.code()),
            })
        })
        .collect()
}

fn outcome_json(outcome: &SyncOutcome) -> serde_json::Value {
    let report = &outcome.report;
    serde_json::json!({
        "success": report.is_success(),
        "request_id": report.request_id.to_string(),
        "source": report.source.display().to_string(),
        "prefix": report.prefix.as_str(),
        "destination": report.destination().map(NodePath::as_str),
        "started_at": report.started_at.to_rfc3339(),
        "duration_ms": report.duration.as_millis() as u64,
        "created": outcome.stats.creates,
        "updated": outcome.stats.updates,
        "prefix_created": outcome.prefix_created,
        "snapshot": outcome.snapshot.display().to_string(),
        "failures": report.failures().map_or_else(|| serde_json::json!([]), failures_json),
    })
}

fn print_human(formatter: &dyn OutputFormatter, outcome: &SyncOutcome) {
    let report = &outcome.report;
    let duration = format_duration(report.duration);

    match &report.outcome {
        Ok(destination) => formatter.success(&format!(
            "Mirrored {} to {} in {}",
            report.source.display(),
            destination,
            duration
        )),
        Err(failures) => {
            formatter.error(&format!(
                "{} failed to sync after {}:",
                plural(failures.len(), "node"),
                duration
            ));
            for (path, error) in failures.iter() {
                formatter.error(&format!("  - {}: {}", path, error));
            }
        }
    }

    if outcome.prefix_created > 0 {
        formatter.info(&format!(
            "Prefix:   {} created",
            plural(outcome.prefix_created, "node")
        ));
    }
    formatter.info(&format!(
        "Created:  {}",
        plural(outcome.stats.creates as usize, "node")
    ));
    formatter.info(&format!(
        "Updated:  {}",
        plural(outcome.stats.updates as usize, "node")
    ));
    formatter.info(&format!("Snapshot: {}", outcome.snapshot.display()));
}
