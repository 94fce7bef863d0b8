//! Exposition registry for computed rates.

use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, GaugeVec, IntGauge, Opts, Registry, TextEncoder};
use ratewatch_domain::{CycleReport, RateWatchError, Result};

/// Gauges republishing the current cycle report.
///
/// [`ExporterMetrics::render_report`] replaces the whole DPM gauge family
/// and renders under one lock, so every scrape reflects exactly one report
/// even when scrapes run concurrently.
pub struct ExporterMetrics {
    registry: Registry,
    scrape_lock: Mutex<()>,
    dpm: GaugeVec,
    runtime_seconds: Gauge,
    avg_metric_seconds: Gauge,
    metrics_processed: IntGauge,
    metrics_failed: IntGauge,
    processing_rate: Gauge,
    last_update: Gauge,
}

impl ExporterMetrics {
    /// Create the registry and register every gauge.
    ///
    /// # Errors
    /// Returns `RateWatchError::Internal` if gauge registration fails.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let dpm = GaugeVec::new(
            Opts::new("metric_dpm_rate", "Data points per minute for each metric"),
            &["metric_name"],
        )
        .map_err(internal)?;
        let runtime_seconds = Gauge::new(
            "ratewatch_runtime_seconds",
            "Total runtime of the last DPM calculation",
        )
        .map_err(internal)?;
        let avg_metric_seconds = Gauge::new(
            "ratewatch_avg_metric_process_seconds",
            "Average time to process each metric",
        )
        .map_err(internal)?;
        let metrics_processed = IntGauge::new(
            "ratewatch_metrics_processed",
            "Number of metrics processed in the last cycle",
        )
        .map_err(internal)?;
        let metrics_failed = IntGauge::new(
            "ratewatch_metrics_failed",
            "Number of metrics that failed evaluation in the last cycle",
        )
        .map_err(internal)?;
        let processing_rate = Gauge::new(
            "ratewatch_processing_rate_metrics_per_second",
            "Rate of metric processing",
        )
        .map_err(internal)?;
        let last_update = Gauge::new(
            "ratewatch_last_update_timestamp_seconds",
            "Unix timestamp of the last snapshot update",
        )
        .map_err(internal)?;

        registry.register(Box::new(dpm.clone())).map_err(internal)?;
        registry.register(Box::new(runtime_seconds.clone())).map_err(internal)?;
        registry.register(Box::new(avg_metric_seconds.clone())).map_err(internal)?;
        registry.register(Box::new(metrics_processed.clone())).map_err(internal)?;
        registry.register(Box::new(metrics_failed.clone())).map_err(internal)?;
        registry.register(Box::new(processing_rate.clone())).map_err(internal)?;
        registry.register(Box::new(last_update.clone())).map_err(internal)?;

        Ok(Self {
            registry,
            scrape_lock: Mutex::new(()),
            dpm,
            runtime_seconds,
            avg_metric_seconds,
            metrics_processed,
            metrics_failed,
            processing_rate,
            last_update,
        })
    }

    /// Replace all published values with the given report's and render the
    /// exposition text.
    ///
    /// The update and the render happen under one lock; a concurrent scrape
    /// cannot observe the DPM family mid-repopulation.
    ///
    /// # Errors
    /// Returns `RateWatchError::Internal` if encoding fails.
    pub fn render_report(&self, report: &CycleReport) -> Result<String> {
        let _guard = self.scrape_lock.lock();
        self.apply_report(report);
        self.encode()
    }

    /// Render the registry without refreshing it; only the (zero-valued)
    /// self metrics appear before the first report.
    ///
    /// # Errors
    /// Returns `RateWatchError::Internal` if encoding fails.
    pub fn render(&self) -> Result<String> {
        let _guard = self.scrape_lock.lock();
        self.encode()
    }

    fn apply_report(&self, report: &CycleReport) {
        self.dpm.reset();
        for result in &report.results {
            self.dpm.with_label_values(&[&sanitize_label_value(&result.name)]).set(result.dpm);
        }

        self.runtime_seconds.set(report.stats.total_runtime_seconds);
        self.avg_metric_seconds.set(report.stats.avg_metric_seconds);
        self.metrics_processed.set((report.stats.succeeded + report.stats.failed) as i64);
        self.metrics_failed.set(report.stats.failed as i64);
        self.processing_rate.set(report.stats.metrics_per_second);
        self.last_update.set(report.finished_at.timestamp() as f64);
    }

    fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer).map_err(internal)?;
        String::from_utf8(buffer)
            .map_err(|e| RateWatchError::Internal(format!("non-UTF8 exposition output: {e}")))
    }
}

fn internal<E: std::fmt::Display>(err: E) -> RateWatchError {
    RateWatchError::Internal(err.to_string())
}

/// Replace characters Prometheus label values commonly trip over in
/// downstream tooling (`-`, `.`, `:`) with underscores.
fn sanitize_label_value(name: &str) -> String {
    name.replace(['-', '.', ':'], "_")
}
