//! Cycle orchestration
//!
//! One cycle is a complete discovery → filter → compute → select pass
//! producing an immutable [`CycleReport`]. Per-metric failures are counted
//! and carried in the report; only discovery/rules-listing failures abort
//! the cycle, because without them no metric universe can be established.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use ratewatch_domain::{AnalysisConfig, CycleReport, CycleStats, Result};
use tracing::{info, warn};

use crate::dispatch::dispatch;
use crate::filter::MetricFilter;
use crate::ports::MetricsBackend;
use crate::rate::RateCalculator;
use crate::select::{LabelPattern, Selection};

/// Runs complete analysis cycles against a backend.
pub struct CycleService {
    backend: Arc<dyn MetricsBackend>,
    filter: MetricFilter,
    calculator: Arc<RateCalculator>,
    selection: Selection,
    worker_count: usize,
}

impl CycleService {
    /// Assemble a cycle service from the analysis configuration.
    ///
    /// # Errors
    /// Returns `RateWatchError::InvalidInput` if the configured label filter
    /// expression does not parse.
    pub fn from_config(backend: Arc<dyn MetricsBackend>, config: &AnalysisConfig) -> Result<Self> {
        let filter =
            MetricFilter::new(config.excluded_suffixes.clone(), config.excluded_prefixes.clone());

        let calculator = Arc::new(
            RateCalculator::new(Arc::clone(&backend), config.window_minutes)
                .with_series_count(config.with_series_count)
                .with_labels(config.with_labels),
        );

        let label_pattern = match &config.label_filter {
            Some(expr) => {
                if !config.with_labels {
                    warn!(
                        pattern = expr.as_str(),
                        "label filter configured without label enrichment; it will pass all results through"
                    );
                }
                Some(LabelPattern::parse(expr)?)
            }
            None => None,
        };

        let selection = Selection::new(config.min_dpm)
            .label_pattern(label_pattern)
            .sort_by(config.sort_by)
            .top_n(config.top_n);

        Ok(Self {
            backend,
            filter,
            calculator,
            selection,
            worker_count: config.worker_count.max(1),
        })
    }

    /// Run one full cycle.
    ///
    /// # Errors
    /// Returns an error only when discovery or rules listing fails; per-metric
    /// failures are recorded in the report instead.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let names = self.backend.list_metric_names().await?;
        let discovered = names.len();
        info!(discovered, "discovered metric universe");

        let rule_names = self.backend.list_aggregation_rule_names().await?;
        if !rule_names.is_empty() {
            info!(count = rule_names.len(), "found metrics with aggregation rules");
        }

        let survivors = self.filter.apply(names, &rule_names);
        let filtered_out = discovered - survivors.len();
        info!(remaining = survivors.len(), filtered_out, "filtered metric universe");

        let worker = Arc::clone(&self.calculator) as Arc<dyn crate::dispatch::MetricWorker>;
        let outcome = dispatch(survivors, worker, self.worker_count).await;
        let succeeded = outcome.results.len();
        let failed = outcome.failures.len();
        if failed > 0 {
            warn!(failed, "some metrics could not be evaluated");
        }

        let results = self.selection.apply(outcome.results);
        let finished_at = Utc::now();
        let total_runtime_seconds = clock.elapsed().as_secs_f64();
        let stats =
            CycleStats::derive(discovered, filtered_out, succeeded, failed, total_runtime_seconds);

        info!(
            selected = results.len(),
            succeeded,
            failed,
            runtime_seconds = format!("{total_runtime_seconds:.2}").as_str(),
            "cycle complete"
        );

        Ok(CycleReport { results, failures: outcome.failures, started_at, finished_at, stats })
    }
}
