//! `sync` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use clock_sync::{ClockSynchronizer, FsStore, RecordingStore};
use contracts::{RecordingError, RecordingRef, SyncRequest, SyncReport, TaskStatus};
use observability::record_sync_report;

use crate::cli::SyncArgs;

/// Store wrapper that computes everything but writes nothing.
struct DryRunStore(FsStore);

impl RecordingStore for DryRunStore {
    type Recording = <FsStore as RecordingStore>::Recording;

    fn open(&self, recording: &RecordingRef) -> Result<Self::Recording, RecordingError> {
        self.0.open(recording)
    }

    fn patch_start_time(
        &self,
        recording: &RecordingRef,
        start_ms: i64,
    ) -> Result<(), RecordingError> {
        info!(path = %recording.path.display(), start_ms, "dry run: would patch start time");
        Ok(())
    }
}

/// Execute the `sync` command
pub fn run_sync(args: &SyncArgs) -> Result<()> {
    if args.metrics_port > 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let request = build_request(args)?;
    info!(
        reference = %request.reference.path.display(),
        targets = request.targets.len(),
        dry_run = args.dry_run,
        "Starting synchronization"
    );

    let report = if args.dry_run {
        ClockSynchronizer::new(DryRunStore(FsStore)).synchronize(&request)?
    } else {
        ClockSynchronizer::default().synchronize(&request)?
    };
    record_sync_report(&report);

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize sync report")?;
        println!("{}", json);
    } else {
        print_report(&report, args.dry_run);
    }

    if report.status == TaskStatus::Complete {
        Ok(())
    } else {
        anyhow::bail!("{} of {} targets failed", report.failed_count(), report.outcomes.len())
    }
}

/// Resolve data kinds by reading each file's header.
fn build_request(args: &SyncArgs) -> Result<SyncRequest> {
    let reference_kind = headers::load_header(&args.reference)
        .with_context(|| format!("Failed to read reference '{}'", args.reference.display()))?
        .kind;

    let mut targets = Vec::with_capacity(args.targets.len());
    for path in &args.targets {
        let kind = headers::load_header(path)
            .with_context(|| format!("Failed to read target '{}'", path.display()))?
            .kind;
        targets.push(RecordingRef::new(path.clone(), kind));
    }

    Ok(SyncRequest {
        reference: RecordingRef::new(args.reference.clone(), reference_kind),
        targets,
    })
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let verb = if dry_run { "would patch" } else { "patched" };
    for outcome in &report.outcomes {
        match &outcome.error {
            Some(error) => println!("FAIL  {}: {}", outcome.path.display(), error),
            None if outcome.patched => println!(
                "OK    {}: {} start {} -> {} ms",
                outcome.path.display(),
                verb,
                outcome.actual_start_ms,
                outcome.expected_start_ms
            ),
            None => println!("OK    {}: already correct", outcome.path.display()),
        }
    }
    println!(
        "{} patched, {} failed, {} total",
        report.patched_count(),
        report.failed_count(),
        report.outcomes.len()
    );
}
