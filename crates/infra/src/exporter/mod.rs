//! Exporter endpoint for service mode
//!
//! Republishes the latest cycle's DPM results as scrapeable gauges, plus
//! run-performance metadata, on `/metrics`. Health and readiness probes are
//! served alongside; readiness reflects whether a first snapshot exists.

pub mod registry;
pub mod server;

pub use registry::ExporterMetrics;
pub use server::ExporterServer;
