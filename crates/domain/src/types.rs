//! Common data types used throughout the application

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FailureKind;

/// Computed ingestion rate for a single metric.
///
/// Exactly one result exists per metric name within a cycle. `impact_score`
/// is present iff `active_series` is present; `labels` is present only when
/// label enrichment was requested and succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRateResult {
    pub name: String,
    /// Data points per minute, `points_in_window / window_minutes`. Never
    /// negative; zero is a legitimate value (idle metric), not a failure.
    pub dpm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_series: Option<u64>,
    /// `dpm * active_series`, approximating total ingestion load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl MetricRateResult {
    /// Plain result with only a rate, no enrichment.
    pub fn new(name: impl Into<String>, dpm: f64) -> Self {
        Self { name: name.into(), dpm, active_series: None, impact_score: None, labels: None }
    }

    /// Attach an active-series count and derive the impact score.
    pub fn with_active_series(mut self, active_series: u64) -> Self {
        self.impact_score = Some(self.dpm * active_series as f64);
        self.active_series = Some(active_series);
        self
    }
}

/// Record of a metric that could not be evaluated after exhausting retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub metric: String,
    pub kind: FailureKind,
    pub attempts: u32,
}

/// Sort order applied by the result selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// DPM descending, metric name ascending on ties.
    #[default]
    Dpm,
    /// Metric name ascending.
    Name,
}

/// Counts and derived performance figures for one completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleStats {
    pub discovered: usize,
    pub filtered_out: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_runtime_seconds: f64,
    pub avg_metric_seconds: f64,
    pub metrics_per_second: f64,
}

impl CycleStats {
    /// Derive the performance figures from raw counts and the cycle runtime.
    pub fn derive(
        discovered: usize,
        filtered_out: usize,
        succeeded: usize,
        failed: usize,
        total_runtime_seconds: f64,
    ) -> Self {
        let processed = succeeded + failed;
        let avg_metric_seconds =
            if processed > 0 { total_runtime_seconds / processed as f64 } else { 0.0 };
        let metrics_per_second = if total_runtime_seconds > 0.0 {
            processed as f64 / total_runtime_seconds
        } else {
            0.0
        };
        Self {
            discovered,
            filtered_out,
            succeeded,
            failed,
            total_runtime_seconds,
            avg_metric_seconds,
            metrics_per_second,
        }
    }
}

/// Immutable snapshot produced by one refresh cycle.
///
/// `results` already has selection applied and is in presentation order.
/// Published atomically in service mode: readers see either the previous
/// complete report or this one, never a partial one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub results: Vec<MetricRateResult>,
    pub failures: Vec<FailureRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: CycleStats,
}
