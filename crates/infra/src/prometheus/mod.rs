//! Prometheus API client
//!
//! Implements the core [`ratewatch_core::MetricsBackend`] port against the
//! Prometheus HTTP API: label-value listing for metric discovery, instant
//! queries for rate computation, and the aggregation-rules listing.

pub mod client;
pub mod types;

pub use client::PrometheusClient;
