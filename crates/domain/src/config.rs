//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::SortKey;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub analysis: AnalysisConfig,
    pub exporter: ExporterConfig,
}

/// Monitoring backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, e.g. `https://prometheus.example.com`.
    pub endpoint: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
}

/// Rate-analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub window_minutes: u32,
    pub min_dpm: f64,
    pub worker_count: usize,
    pub sort_by: SortKey,
    pub top_n: Option<usize>,
    /// `key=value` exact or `key=~regex` label pattern.
    pub label_filter: Option<String>,
    pub with_series_count: bool,
    pub with_labels: bool,
    pub excluded_suffixes: Vec<String>,
    pub excluded_prefixes: Vec<String>,
}

/// Exporter (service mode) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub port: u16,
    pub refresh_interval_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: String::new(),
            api_key: String::new(),
            timeout_seconds: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attempts: constants::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_minutes: constants::DEFAULT_WINDOW_MINUTES,
            min_dpm: constants::DEFAULT_MIN_DPM,
            worker_count: constants::DEFAULT_WORKER_COUNT,
            sort_by: SortKey::default(),
            top_n: None,
            label_filter: None,
            with_series_count: false,
            with_labels: false,
            excluded_suffixes: constants::DEFAULT_EXCLUDED_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_prefixes: constants::DEFAULT_EXCLUDED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            port: constants::DEFAULT_EXPORTER_PORT,
            refresh_interval_seconds: constants::DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            analysis: AnalysisConfig::default(),
            exporter: ExporterConfig::default(),
        }
    }
}
