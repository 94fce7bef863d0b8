//! Prometheus API payload types

use std::collections::BTreeMap;

use serde::Deserialize;

/// `GET /api/v1/label/__name__/values` response.
#[derive(Debug, Deserialize)]
pub struct LabelValuesResponse {
    pub status: String,
    #[serde(default)]
    pub data: Vec<String>,
}

/// `GET /api/v1/query` response envelope.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    pub data: QueryData,
}

/// Query result payload; `result` shape depends on `resultType`.
#[derive(Debug, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: serde_json::Value,
}

/// One series of an instant-vector result.
#[derive(Debug, Deserialize)]
pub struct VectorSample {
    pub metric: BTreeMap<String, String>,
    /// `[unix_timestamp, "value"]` pair; the value is a stringified float.
    pub value: (f64, String),
}

/// One backend-side aggregation rule; only the metric name matters here.
#[derive(Debug, Deserialize)]
pub struct AggregationRule {
    pub metric: String,
}
