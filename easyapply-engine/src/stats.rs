//! Run-wide counters owned by the engine and handed to reporting.
use crate::job::{JobOutcome, JobReport};
use chrono::{DateTime, Utc};
use easyapply_common::ErrorKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Fixed-bucket histogram. `counts[i]` holds samples `<= bounds[i]`; the
/// final slot holds everything above the last bound.
#[derive(Debug, Clone, Serialize)]
pub struct Histogram {
    bounds: Vec<f64>,
    counts: Vec<u64>,
    sum: f64,
    samples: u64,
}

impl Histogram {
    pub fn new(bounds: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            counts: vec![0; bounds.len() + 1],
            sum: 0.0,
            samples: 0,
        }
    }

    pub fn observe(&mut self, value: f64) {
        let slot = self
            .bounds
            .iter()
            .position(|b| value <= *b)
            .unwrap_or(self.bounds.len());
        self.counts[slot] += 1;
        self.sum += value;
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn mean(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / self.samples as f64)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
}

const DURATION_BOUNDS_SECS: [f64; 7] = [15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0];
const PAGE_BOUNDS: [f64; 6] = [1.0, 2.0, 3.0, 5.0, 8.0, 10.0];

#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub started_at: DateTime<Utc>,
    pub attempted: u32,
    pub submitted: u32,
    pub failed: u32,
    pub abandoned: u32,
    /// Listings without an Easy Apply entry point.
    pub skipped: u32,
    /// Submitted jobs that turned out to be applied to already.
    pub already_applied: u32,
    pub failures_by_kind: BTreeMap<ErrorKind, u32>,
    pub job_durations: Histogram,
    pub pages_per_job: Histogram,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            attempted: 0,
            submitted: 0,
            failed: 0,
            abandoned: 0,
            skipped: 0,
            already_applied: 0,
            failures_by_kind: BTreeMap::new(),
            job_durations: Histogram::new(&DURATION_BOUNDS_SECS),
            pages_per_job: Histogram::new(&PAGE_BOUNDS),
        }
    }
}

impl RunStatistics {
    pub fn record(&mut self, report: &JobReport) {
        self.attempted += 1;
        match &report.outcome {
            JobOutcome::Submitted => {
                self.submitted += 1;
                if report.already_applied {
                    self.already_applied += 1;
                }
            }
            JobOutcome::Abandoned { .. } => self.abandoned += 1,
            JobOutcome::Failed { error, .. } => {
                self.failed += 1;
                *self.failures_by_kind.entry(*error).or_default() += 1;
            }
        }
        self.job_durations.observe(report.duration.as_secs_f64());
        self.pages_per_job.observe(f64::from(report.pages));
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Submitted over attempted, as a percentage.
    pub fn success_rate(&self) -> Option<f64> {
        (self.attempted > 0).then(|| f64::from(self.submitted) / f64::from(self.attempted) * 100.0)
    }

    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.started_at).to_std().unwrap_or_default()
    }

    /// Emit the counters as a single structured event.
    pub fn log_summary(&self, message: &'static str) {
        let failures = self
            .failures_by_kind
            .iter()
            .map(|(k, n)| format!("{k}={n}"))
            .collect::<Vec<_>>()
            .join(",");
        info!(
            target: "easyapply.run",
            attempted = self.attempted,
            submitted = self.submitted,
            failed = self.failed,
            abandoned = self.abandoned,
            skipped = self.skipped,
            already_applied = self.already_applied,
            success_rate = self.success_rate().map(|r| format!("{r:.1}%")).unwrap_or_else(|| "n/a".into()),
            mean_job_secs = self.job_durations.mean().map(|m| format!("{m:.1}")).unwrap_or_default(),
            elapsed_secs = self.elapsed().as_secs(),
            failures = %failures,
            "{message}"
        );
    }
}
