//! Port interfaces for backend queries
//!
//! These traits define the boundary between core analysis logic and the
//! infrastructure implementation that talks to the monitoring backend.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use ratewatch_domain::BackendError;

/// One sample from an instant-vector query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Label set of the series, including `__name__`.
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: BTreeMap<String, String>, value: f64) -> Self {
        Self { labels, value }
    }
}

/// Read-only query interface to the monitoring backend.
///
/// Implementations apply authentication, per-request timeouts and
/// retry-with-backoff internally; a returned [`BackendError`] means retries
/// are already exhausted. All methods are safe to call concurrently.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    /// List every metric name known to the backend (the metric universe).
    async fn list_metric_names(&self) -> Result<Vec<String>, BackendError>;

    /// List the metric names produced by backend-side aggregation rules.
    async fn list_aggregation_rule_names(&self) -> Result<HashSet<String>, BackendError>;

    /// Execute a PromQL expression as an instant query.
    ///
    /// An empty vector is a valid response (no series matched), not an error.
    async fn instant_query(&self, expr: &str) -> Result<Vec<Sample>, BackendError>;
}
