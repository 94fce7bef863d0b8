//! Bounded-concurrency metric dispatch
//!
//! Fans a metric-name list out across a fixed-size worker pool. Every input
//! name yields exactly one outcome (result or failure); a failing metric
//! never aborts the batch, and the pool drains fully before returning.
//! Output ordering is unspecified; the result selector sorts downstream.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use ratewatch_domain::{FailureRecord, MetricRateResult};
use tracing::{debug, error};

/// Per-metric evaluation applied by each worker.
#[async_trait]
pub trait MetricWorker: Send + Sync {
    async fn evaluate(&self, name: &str) -> Result<MetricRateResult, FailureRecord>;
}

/// Aggregated outcome of one dispatch batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<MetricRateResult>,
    pub failures: Vec<FailureRecord>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

/// Process `names` with at most `concurrency` workers (minimum 1).
///
/// Workers pull from a shared queue populated up front, so no name is
/// processed twice and none is dropped. All in-flight work is awaited before
/// returning; there is no early exit on failure.
pub async fn dispatch(
    names: Vec<String>,
    worker: Arc<dyn MetricWorker>,
    concurrency: usize,
) -> BatchOutcome {
    let total = names.len();
    let worker_count = concurrency.max(1).min(total.max(1));

    let queue = Arc::new(Mutex::new(names.into_iter().collect::<VecDeque<_>>()));
    let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let failures = Arc::new(Mutex::new(Vec::new()));

    debug!(total, worker_count, "dispatching metric batch");

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let queue = Arc::clone(&queue);
        let results = Arc::clone(&results);
        let failures = Arc::clone(&failures);
        let worker = Arc::clone(&worker);

        handles.push(tokio::spawn(async move {
            loop {
                let name = { queue.lock().pop_front() };
                let Some(name) = name else { break };

                match worker.evaluate(&name).await {
                    Ok(result) => results.lock().push(result),
                    Err(failure) => failures.lock().push(failure),
                }
            }
        }));
    }

    // Full drain: join every worker even if one of them panicked.
    for handle in handles {
        if let Err(err) = handle.await {
            error!(error = %err, "dispatch worker task failed");
        }
    }

    let results = Arc::try_unwrap(results)
        .map(Mutex::into_inner)
        .unwrap_or_else(|shared| shared.lock().drain(..).collect());
    let failures = Arc::try_unwrap(failures)
        .map(Mutex::into_inner)
        .unwrap_or_else(|shared| shared.lock().drain(..).collect());

    BatchOutcome { results, failures }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use ratewatch_domain::FailureKind;

    use super::*;

    /// Worker that fails for a configured set of names and counts
    /// simultaneous in-flight evaluations.
    struct TestWorker {
        failing: HashSet<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl TestWorker {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricWorker for TestWorker {
        async fn evaluate(&self, name: &str) -> Result<MetricRateResult, FailureRecord> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(name) {
                Err(FailureRecord { metric: name.to_string(), kind: FailureKind::Timeout, attempts: 3 })
            } else {
                Ok(MetricRateResult::new(name, 1.0))
            }
        }
    }

    fn names(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("metric_{i}")).collect()
    }

    #[tokio::test]
    async fn exactly_one_outcome_per_name_at_any_concurrency() {
        for concurrency in [1usize, 2, 4, 8, 32] {
            let input = names(25);
            let worker = Arc::new(TestWorker::new(&["metric_3", "metric_17"]));
            let outcome = dispatch(input.clone(), worker, concurrency).await;

            assert_eq!(outcome.total(), input.len(), "concurrency {concurrency}");
            assert_eq!(outcome.failures.len(), 2);

            let mut seen: Vec<String> = outcome
                .results
                .iter()
                .map(|r| r.name.clone())
                .chain(outcome.failures.iter().map(|f| f.metric.clone()))
                .collect();
            seen.sort();
            let mut expected = input;
            expected.sort();
            assert_eq!(seen, expected, "concurrency {concurrency}");
        }
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_batch() {
        let input = names(10);
        let failing: Vec<&str> = vec!["metric_0", "metric_5", "metric_9"];
        let worker = Arc::new(TestWorker::new(&failing));
        let outcome = dispatch(input, worker, 4).await;

        assert_eq!(outcome.results.len(), 7);
        assert_eq!(outcome.failures.len(), 3);
        for failure in &outcome.failures {
            assert_eq!(failure.kind, FailureKind::Timeout);
            assert_eq!(failure.attempts, 3);
        }
    }

    #[tokio::test]
    async fn concurrency_is_bounded_by_worker_count() {
        let worker = Arc::new(TestWorker::new(&[]));
        let _ = dispatch(names(40), Arc::clone(&worker) as Arc<dyn MetricWorker>, 4).await;
        assert!(worker.max_in_flight.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped_to_one() {
        let worker = Arc::new(TestWorker::new(&[]));
        let outcome = dispatch(names(3), worker, 0).await;
        assert_eq!(outcome.results.len(), 3);
    }

    #[tokio::test]
    async fn empty_input_returns_empty_outcome() {
        let worker = Arc::new(TestWorker::new(&[]));
        let outcome = dispatch(Vec::new(), worker, 8).await;
        assert_eq!(outcome.total(), 0);
    }
}
