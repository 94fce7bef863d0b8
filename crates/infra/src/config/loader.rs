//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load backend credentials from environment variables
//! 2. If incomplete, falls back to loading from a config file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `PROMETHEUS_ENDPOINT`: Base URL of the monitoring backend
//! - `PROMETHEUS_USERNAME`: Basic-auth username
//! - `PROMETHEUS_API_KEY`: Basic-auth API key
//! - `RATEWATCH_TIMEOUT_SECONDS`: Per-request timeout (optional)
//! - `RATEWATCH_MAX_ATTEMPTS`: Retry attempt budget (optional)
//! - `RATEWATCH_WINDOW_MINUTES`: Rate sampling window (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml`
//! 2. `./ratewatch.json` or `./ratewatch.toml`

use std::path::{Path, PathBuf};

use ratewatch_domain::{BackendConfig, Config, RateWatchError, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to assemble a configuration from environment variables.
/// If the required credentials are missing, falls back to a config file.
///
/// # Errors
/// Returns `RateWatchError::Config` if neither source yields a usable
/// configuration.
pub fn load() -> Result<Config> {
    match load_credentials_from_env() {
        Ok(backend) => {
            tracing::info!("Configuration loaded from environment variables");
            let mut config = Config { backend, ..Config::default() };
            apply_env_overrides(&mut config)?;
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            let mut config = load_from_file(None)?;
            apply_env_overrides(&mut config)?;
            Ok(config)
        }
    }
}

/// Load backend credentials from environment variables
///
/// # Errors
/// Returns `RateWatchError::Config` if any required variable is missing.
pub fn load_credentials_from_env() -> Result<BackendConfig> {
    let endpoint = env_var("PROMETHEUS_ENDPOINT")?;
    let username = env_var("PROMETHEUS_USERNAME")?;
    let api_key = env_var("PROMETHEUS_API_KEY")?;

    Ok(BackendConfig { endpoint, username, api_key, ..BackendConfig::default() })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is detected by
/// file extension (JSON or TOML).
///
/// # Errors
/// Returns `RateWatchError::Config` if the file is missing or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(RateWatchError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            RateWatchError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| RateWatchError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, format by extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(contents)
            .map_err(|e| RateWatchError::Config(format!("Invalid JSON config: {e}"))),
        Some("toml") => toml::from_str(contents)
            .map_err(|e| RateWatchError::Config(format!("Invalid TOML config: {e}"))),
        other => Err(RateWatchError::Config(format!(
            "Unsupported config extension {:?} for {}",
            other,
            path.display()
        ))),
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    const CANDIDATES: &[&str] =
        &["config.json", "config.toml", "ratewatch.json", "ratewatch.toml"];

    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Apply optional environment overrides on top of a loaded configuration.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(timeout) = parse_env("RATEWATCH_TIMEOUT_SECONDS")? {
        config.backend.timeout_seconds = timeout;
    }
    if let Some(attempts) = parse_env("RATEWATCH_MAX_ATTEMPTS")? {
        config.backend.max_attempts = attempts;
    }
    if let Some(window) = parse_env("RATEWATCH_WINDOW_MINUTES")? {
        config.analysis.window_minutes = window;
    }
    Ok(())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| RateWatchError::Config(format!("Missing environment variable: {name}")))
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| RateWatchError::Config(format!("Invalid value for {name}: {e}"))),
        Err(_) => Ok(None),
    }
}
