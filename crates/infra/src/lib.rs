//! # RateWatch Infra
//!
//! Infrastructure adapters for RateWatch:
//! - HTTP client with retry/backoff ([`http`])
//! - Prometheus API client implementing the core backend port
//!   ([`prometheus`])
//! - Configuration loading ([`config`])
//! - Refresh scheduling and snapshot publication ([`scheduling`])
//! - Exporter registry and HTTP endpoint ([`exporter`])

pub mod config;
pub mod exporter;
pub mod http;
pub mod prometheus;
pub mod scheduling;

pub use exporter::{ExporterMetrics, ExporterServer};
pub use http::HttpClient;
pub use prometheus::PrometheusClient;
pub use scheduling::{RefreshScheduler, RefreshSchedulerConfig, SnapshotSlot};
