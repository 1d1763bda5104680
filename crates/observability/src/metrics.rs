//! Metrics collection for synchronization runs and series construction.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

use contracts::SyncReport;

/// Record one finished synchronization run.
///
/// Call once per `SyncReport`, after the run completes.
pub fn record_sync_report(report: &SyncReport) {
    counter!("recsync_sync_reports_total").increment(1);
    gauge!("recsync_sync_targets_last").set(report.outcomes.len() as f64);

    for outcome in &report.outcomes {
        if let Some(error) = &outcome.error {
            counter!("recsync_target_failures_total").increment(1);
            tracing::debug!(path = %outcome.path.display(), error, "recorded target failure");
            continue;
        }
        if outcome.patched {
            let correction_ms = (outcome.expected_start_ms - outcome.actual_start_ms).abs();
            histogram!("recsync_start_correction_ms").record(correction_ms as f64);
        }
    }
}

/// Record a series construction attempt.
pub fn record_series_built(segment_count: usize, sample_count: usize) {
    counter!("recsync_series_validated_total").increment(1);
    gauge!("recsync_series_segments_last").set(segment_count as f64);
    gauge!("recsync_series_samples_last").set(sample_count as f64);
}

/// In-memory aggregation across synchronization runs, for end-of-session
/// summaries independent of the Prometheus exporter.
#[derive(Debug, Clone, Default)]
pub struct SyncRunAggregator {
    pub total_runs: u64,
    pub total_targets: u64,
    pub total_patched: u64,
    pub total_failed: u64,
    /// Magnitude of applied start corrections, in milliseconds.
    pub correction_stats: RunningStats,
    /// Failure message counts keyed by target path.
    pub failure_counts: HashMap<String, u64>,
}

impl SyncRunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &SyncReport) {
        self.total_runs += 1;
        self.total_targets += report.outcomes.len() as u64;
        self.total_patched += report.patched_count() as u64;
        self.total_failed += report.failed_count() as u64;

        for outcome in &report.outcomes {
            if outcome.error.is_some() {
                *self
                    .failure_counts
                    .entry(outcome.path.display().to_string())
                    .or_insert(0) += 1;
            } else if outcome.patched {
                let correction = (outcome.expected_start_ms - outcome.actual_start_ms).abs();
                self.correction_stats.push(correction as f64);
            }
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_runs: self.total_runs,
            total_targets: self.total_targets,
            total_patched: self.total_patched,
            total_failed: self.total_failed,
            patch_rate: if self.total_targets > 0 {
                self.total_patched as f64 / self.total_targets as f64 * 100.0
            } else {
                0.0
            },
            correction_ms: StatsSummary::from(&self.correction_stats),
            failure_counts: self.failure_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Printable summary of aggregated runs.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total_runs: u64,
    pub total_targets: u64,
    pub total_patched: u64,
    pub total_failed: u64,
    pub patch_rate: f64,
    pub correction_ms: StatsSummary,
    pub failure_counts: HashMap<String, u64>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Synchronization Summary ===")?;
        writeln!(f, "Runs: {}", self.total_runs)?;
        writeln!(
            f,
            "Targets patched: {}/{} ({:.2}%)",
            self.total_patched, self.total_targets, self.patch_rate
        )?;
        writeln!(f, "Targets failed: {}", self.total_failed)?;
        writeln!(f, "Correction (ms): {}", self.correction_ms)?;

        if !self.failure_counts.is_empty() {
            writeln!(f, "Failure counts:")?;
            for (path, count) in &self.failure_counts {
                writeln!(f, "  {}: {}", path, count)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm).
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
