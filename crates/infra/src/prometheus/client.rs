//! Prometheus HTTP API client implementing the backend port.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ratewatch_core::ports::{MetricsBackend, Sample};
use ratewatch_domain::{BackendConfig, BackendError, FailureKind, RateWatchError, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::types::{AggregationRule, LabelValuesResponse, QueryResponse, VectorSample};
use crate::http::HttpClient;

/// Client for the Prometheus HTTP API.
///
/// Holds no per-call mutable state; safe to share across dispatch workers.
pub struct PrometheusClient {
    http: HttpClient,
    names_url: Url,
    query_url: Url,
    rules_url: Url,
    username: String,
    api_key: String,
}

impl PrometheusClient {
    /// Build a client from the backend configuration.
    ///
    /// # Errors
    /// Returns `RateWatchError::Config` if the endpoint is not a valid URL.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base = config.endpoint.trim_end_matches('/');
        let parse = |path: &str| -> Result<Url> {
            Url::parse(&format!("{base}{path}")).map_err(|e| {
                RateWatchError::Config(format!("invalid backend endpoint '{base}': {e}"))
            })
        };

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .max_attempts(config.max_attempts)
            .build()
            .map_err(RateWatchError::from)?;

        Ok(Self {
            http,
            names_url: parse("/api/v1/label/__name__/values")?,
            query_url: parse("/api/v1/query")?,
            rules_url: parse("/aggregations/rules")?,
            username: config.username.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, BackendError> {
        let mut builder = self
            .http
            .request(Method::GET, url.clone())
            .basic_auth(&self.username, Some(&self.api_key));
        if !query.is_empty() {
            builder = builder.query(query);
        }

        let response = self.http.send(builder).await?;
        response.json::<T>().await.map_err(|err| {
            BackendError::new(FailureKind::MalformedResponse, 1, err.to_string())
        })
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn list_metric_names(&self) -> std::result::Result<Vec<String>, BackendError> {
        let response: LabelValuesResponse = self.get_json(&self.names_url, &[]).await?;
        if response.status != "success" {
            return Err(BackendError::new(
                FailureKind::MalformedResponse,
                1,
                format!("label values listing returned status '{}'", response.status),
            ));
        }
        debug!(count = response.data.len(), "listed metric names");
        Ok(response.data)
    }

    async fn list_aggregation_rule_names(
        &self,
    ) -> std::result::Result<HashSet<String>, BackendError> {
        let rules: Vec<AggregationRule> = self.get_json(&self.rules_url, &[]).await?;
        debug!(count = rules.len(), "listed aggregation rules");
        Ok(rules.into_iter().map(|rule| rule.metric).collect())
    }

    async fn instant_query(&self, expr: &str) -> std::result::Result<Vec<Sample>, BackendError> {
        let response: QueryResponse = self.get_json(&self.query_url, &[("query", expr)]).await?;
        if response.status != "success" {
            return Err(BackendError::new(
                FailureKind::MalformedResponse,
                1,
                format!("query returned status '{}'", response.status),
            ));
        }
        parse_samples(response.data.result_type.as_str(), response.data.result)
    }
}

/// Parse the `result` payload according to its `resultType`.
fn parse_samples(
    result_type: &str,
    result: serde_json::Value,
) -> std::result::Result<Vec<Sample>, BackendError> {
    let malformed = |msg: String| BackendError::new(FailureKind::MalformedResponse, 1, msg);

    match result_type {
        "vector" => {
            let series: Vec<VectorSample> = serde_json::from_value(result)
                .map_err(|e| malformed(format!("invalid vector result: {e}")))?;
            series
                .into_iter()
                .map(|sample| {
                    let value = parse_value(&sample.value.1)?;
                    Ok(Sample::new(sample.metric, value))
                })
                .collect()
        }
        "scalar" => {
            let (_, value): (f64, String) = serde_json::from_value(result)
                .map_err(|e| malformed(format!("invalid scalar result: {e}")))?;
            Ok(vec![Sample::new(Default::default(), parse_value(&value)?)])
        }
        other => Err(malformed(format!("unsupported result type '{other}'"))),
    }
}

fn parse_value(raw: &str) -> std::result::Result<f64, BackendError> {
    raw.parse::<f64>().map_err(|e| {
        BackendError::new(FailureKind::MalformedResponse, 1, format!("invalid sample value '{raw}': {e}"))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_vector_results() {
        let result = json!([
            { "metric": { "__name__": "up", "job": "api" }, "value": [1700000000.0, "60"] },
            { "metric": { "__name__": "up", "job": "db" }, "value": [1700000000.0, "2.5"] }
        ]);
        let samples = parse_samples("vector", result).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 60.0);
        assert_eq!(samples[0].labels.get("job").map(String::as_str), Some("api"));
        assert_eq!(samples[1].value, 2.5);
    }

    #[test]
    fn parses_scalar_results() {
        let samples = parse_samples("scalar", json!([1700000000.0, "42"])).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, 42.0);
    }

    #[test]
    fn rejects_unknown_result_types() {
        let err = parse_samples("matrix", json!([])).unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn rejects_non_numeric_values() {
        let result = json!([{ "metric": {}, "value": [0.0, "not-a-number"] }]);
        let err = parse_samples("vector", result).unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedResponse);
    }
}
