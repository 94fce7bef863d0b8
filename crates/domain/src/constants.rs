//! Application constants
//!
//! Centralized location for all domain-level defaults used throughout the
//! application.

// Rate computation
pub const DEFAULT_WINDOW_MINUTES: u32 = 5;
pub const DEFAULT_MIN_DPM: f64 = 1.0;

// Metric filtering
pub const DEFAULT_EXCLUDED_SUFFIXES: &[&str] = &["_count", "_bucket", "_sum"];
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &["grafana_"];

// Dispatch
pub const DEFAULT_WORKER_COUNT: usize = 10;

// Backend client
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 2000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 60_000;

// Exporter mode
pub const DEFAULT_EXPORTER_PORT: u16 = 9966;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 86_400; // 1 day
pub const INITIAL_COLLECTION_MAX_ATTEMPTS: u32 = 5;
