//! Per-metric rate computation
//!
//! Builds and executes the DPM query for one metric, with optional
//! active-series counting and label enrichment.

use std::sync::Arc;

use ratewatch_domain::{FailureRecord, MetricRateResult};
use tracing::{debug, warn};

use crate::dispatch::MetricWorker;
use crate::ports::{MetricsBackend, Sample};

/// Computes the DPM for a single metric via the backend port.
///
/// The primary query is `count_over_time({name}[{W}m]) / {W}`; an empty
/// result parses to a DPM of zero, which is a legitimate answer. Only a
/// failed primary query (client retries already exhausted) produces a
/// [`FailureRecord`]. The optional series-count and label queries degrade
/// gracefully: their failure leaves the corresponding field absent.
pub struct RateCalculator {
    backend: Arc<dyn MetricsBackend>,
    window_minutes: u32,
    with_series_count: bool,
    with_labels: bool,
}

impl RateCalculator {
    pub fn new(backend: Arc<dyn MetricsBackend>, window_minutes: u32) -> Self {
        Self { backend, window_minutes: window_minutes.max(1), with_series_count: false, with_labels: false }
    }

    /// Also query the active-series count and derive the impact score.
    pub fn with_series_count(mut self, enabled: bool) -> Self {
        self.with_series_count = enabled;
        self
    }

    /// Also enrich results with the label set of a representative series.
    pub fn with_labels(mut self, enabled: bool) -> Self {
        self.with_labels = enabled;
        self
    }

    /// Compute the rate result for `name`.
    pub async fn compute(&self, name: &str) -> Result<MetricRateResult, FailureRecord> {
        let window = self.window_minutes;
        let expr = format!("count_over_time({name}[{window}m]) / {window}");

        let samples = match self.backend.instant_query(&expr).await {
            Ok(samples) => samples,
            Err(err) => {
                warn!(metric = name, error = %err, "DPM query failed");
                return Err(FailureRecord {
                    metric: name.to_string(),
                    kind: err.kind,
                    attempts: err.attempts,
                });
            }
        };

        // No matching series means the metric produced no points in the
        // window: a valid DPM of zero, never a failure.
        let dpm = first_value(&samples).unwrap_or(0.0).max(0.0);
        let mut result = MetricRateResult::new(name, dpm);

        if self.with_series_count {
            let count_expr = format!("count by (__name__) ({name})");
            match self.backend.instant_query(&count_expr).await {
                Ok(samples) => {
                    if let Some(count) = first_value(&samples) {
                        result = result.with_active_series(count.max(0.0) as u64);
                    }
                }
                Err(err) => {
                    debug!(metric = name, error = %err, "series-count query failed; continuing without it");
                }
            }
        }

        if self.with_labels {
            match self.backend.instant_query(&format!("{{__name__=\"{name}\"}}")).await {
                Ok(samples) => {
                    if let Some(sample) = samples.first() {
                        let mut labels = sample.labels.clone();
                        labels.remove("__name__");
                        result.labels = Some(labels);
                    }
                }
                Err(err) => {
                    debug!(metric = name, error = %err, "label query failed; continuing without labels");
                }
            }
        }

        Ok(result)
    }
}

#[async_trait::async_trait]
impl MetricWorker for RateCalculator {
    async fn evaluate(&self, name: &str) -> Result<MetricRateResult, FailureRecord> {
        self.compute(name).await
    }
}

fn first_value(samples: &[Sample]) -> Option<f64> {
    samples.first().map(|sample| sample.value)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap, HashSet};

    use parking_lot::Mutex;
    use ratewatch_domain::{BackendError, FailureKind};

    use super::*;

    /// Backend stub answering instant queries from a fixed expression map.
    struct StubBackend {
        responses: HashMap<String, Result<Vec<Sample>, FailureKind>>,
        queries: Mutex<Vec<String>>,
    }

    impl StubBackend {
        fn new() -> Self {
            Self { responses: HashMap::new(), queries: Mutex::new(Vec::new()) }
        }

        fn on(mut self, expr: &str, samples: Vec<Sample>) -> Self {
            self.responses.insert(expr.to_string(), Ok(samples));
            self
        }

        fn failing(mut self, expr: &str, kind: FailureKind) -> Self {
            self.responses.insert(expr.to_string(), Err(kind));
            self
        }
    }

    fn sample(value: f64) -> Sample {
        Sample::new(BTreeMap::new(), value)
    }

    fn labeled_sample(pairs: &[(&str, &str)], value: f64) -> Sample {
        let labels = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Sample::new(labels, value)
    }

    #[async_trait::async_trait]
    impl MetricsBackend for StubBackend {
        async fn list_metric_names(&self) -> Result<Vec<String>, BackendError> {
            Ok(Vec::new())
        }

        async fn list_aggregation_rule_names(&self) -> Result<HashSet<String>, BackendError> {
            Ok(HashSet::new())
        }

        async fn instant_query(&self, expr: &str) -> Result<Vec<Sample>, BackendError> {
            self.queries.lock().push(expr.to_string());
            match self.responses.get(expr) {
                Some(Ok(samples)) => Ok(samples.clone()),
                Some(Err(kind)) => Err(BackendError::new(*kind, 3, "stubbed failure")),
                None => Ok(Vec::new()),
            }
        }
    }

    #[tokio::test]
    async fn computes_dpm_from_window_count() {
        // 300 points over a 5-minute window => 60 DPM.
        let backend =
            StubBackend::new().on("count_over_time(http_requests_total[5m]) / 5", vec![sample(60.0)]);
        let calculator = RateCalculator::new(Arc::new(backend), 5);

        let result = calculator.compute("http_requests_total").await.unwrap();
        assert_eq!(result.dpm, 60.0);
        assert!(result.active_series.is_none());
        assert!(result.labels.is_none());
    }

    #[tokio::test]
    async fn empty_result_is_zero_dpm_not_failure() {
        let backend = StubBackend::new();
        let calculator = RateCalculator::new(Arc::new(backend), 5);

        let result = calculator.compute("idle_metric").await.unwrap();
        assert_eq!(result.dpm, 0.0);
    }

    #[tokio::test]
    async fn primary_query_failure_yields_failure_record() {
        let backend = StubBackend::new()
            .failing("count_over_time(flaky_metric[5m]) / 5", FailureKind::Timeout);
        let calculator = RateCalculator::new(Arc::new(backend), 5);

        let failure = calculator.compute("flaky_metric").await.unwrap_err();
        assert_eq!(failure.metric, "flaky_metric");
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.attempts, 3);
    }

    #[tokio::test]
    async fn series_count_derives_impact_score() {
        let backend = StubBackend::new()
            .on("count_over_time(http_requests_total[5m]) / 5", vec![sample(60.0)])
            .on("count by (__name__) (http_requests_total)", vec![sample(4.0)]);
        let calculator = RateCalculator::new(Arc::new(backend), 5).with_series_count(true);

        let result = calculator.compute("http_requests_total").await.unwrap();
        assert_eq!(result.active_series, Some(4));
        assert_eq!(result.impact_score, Some(240.0));
    }

    #[tokio::test]
    async fn series_count_failure_degrades_gracefully() {
        let backend = StubBackend::new()
            .on("count_over_time(http_requests_total[5m]) / 5", vec![sample(60.0)])
            .failing("count by (__name__) (http_requests_total)", FailureKind::Http(500));
        let calculator = RateCalculator::new(Arc::new(backend), 5).with_series_count(true);

        let result = calculator.compute("http_requests_total").await.unwrap();
        assert_eq!(result.dpm, 60.0);
        assert!(result.active_series.is_none());
        assert!(result.impact_score.is_none());
    }

    #[tokio::test]
    async fn label_enrichment_strips_name_label() {
        let backend = StubBackend::new()
            .on("count_over_time(http_requests_total[5m]) / 5", vec![sample(60.0)])
            .on(
                "{__name__=\"http_requests_total\"}",
                vec![labeled_sample(
                    &[("__name__", "http_requests_total"), ("job", "api"), ("env", "prod")],
                    1.0,
                )],
            );
        let calculator = RateCalculator::new(Arc::new(backend), 5).with_labels(true);

        let result = calculator.compute("http_requests_total").await.unwrap();
        let labels = result.labels.unwrap();
        assert_eq!(labels.get("job").map(String::as_str), Some("api"));
        assert_eq!(labels.get("env").map(String::as_str), Some("prod"));
        assert!(!labels.contains_key("__name__"));
    }

    #[tokio::test]
    async fn label_query_failure_leaves_labels_absent() {
        let backend = StubBackend::new()
            .on("count_over_time(http_requests_total[5m]) / 5", vec![sample(60.0)])
            .failing("{__name__=\"http_requests_total\"}", FailureKind::Network);
        let calculator = RateCalculator::new(Arc::new(backend), 5).with_labels(true);

        let result = calculator.compute("http_requests_total").await.unwrap();
        assert!(result.labels.is_none());
    }
}
