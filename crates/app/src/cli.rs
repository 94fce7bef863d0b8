//! Command-line interface.
//!
//! Flags override values coming from the environment or a config file, so
//! the precedence is CLI > environment > file > defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ratewatch_domain::{Config, SortKey};

/// Report output format for one-shot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Text,
    Prom,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Text => "txt",
            Self::Prom => "prom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Dpm,
    Name,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Dpm => SortKey::Dpm,
            SortArg::Name => SortKey::Name,
        }
    }
}

/// Analyze per-metric ingestion rates (DPM) of a Prometheus-compatible backend.
#[derive(Debug, Parser)]
#[command(name = "ratewatch", version, about)]
pub struct Cli {
    /// Report format written in one-shot mode
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Only report metrics with a DPM strictly above this threshold
    #[arg(short, long)]
    pub min_dpm: Option<f64>,

    /// Number of concurrent rate queries
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Keep only the top N results after sorting
    #[arg(long)]
    pub top: Option<usize>,

    /// Sort order for the report
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    /// Also query the active series count per metric (extra query each)
    #[arg(long)]
    pub with_series_count: bool,

    /// Also fetch a representative label set per metric (extra query each)
    #[arg(long)]
    pub with_labels: bool,

    /// Keep only results matching `key=value` or `key=~regex`
    #[arg(long)]
    pub label_filter: Option<String>,

    /// Run as a long-lived exporter instead of a one-shot report
    #[arg(short, long)]
    pub exporter: bool,

    /// Exporter listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds between refresh cycles in exporter mode
    #[arg(short, long)]
    pub update_interval: Option<u64>,

    /// Explicit config file path (JSON or TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Fold the CLI flags into a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(min_dpm) = self.min_dpm {
            config.analysis.min_dpm = min_dpm;
        }
        if let Some(threads) = self.threads {
            config.analysis.worker_count = threads;
        }
        if let Some(timeout) = self.timeout {
            config.backend.timeout_seconds = timeout;
        }
        if let Some(top) = self.top {
            config.analysis.top_n = Some(top);
        }
        if let Some(sort) = self.sort {
            config.analysis.sort_by = sort.into();
        }
        if self.with_series_count {
            config.analysis.with_series_count = true;
        }
        if self.with_labels {
            config.analysis.with_labels = true;
        }
        if let Some(pattern) = &self.label_filter {
            config.analysis.label_filter = Some(pattern.clone());
        }
        if let Some(port) = self.port {
            config.exporter.port = port;
        }
        if let Some(interval) = self.update_interval {
            config.exporter.refresh_interval_seconds = interval;
        }
    }

    /// Log filter directive derived from the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["ratewatch"]);
        let mut config = Config::default();
        let before_min_dpm = config.analysis.min_dpm;
        cli.apply_to(&mut config);
        assert_eq!(config.analysis.min_dpm, before_min_dpm);
        assert_eq!(cli.format, OutputFormat::Csv);
        assert!(!cli.exporter);
        assert_eq!(cli.log_directive(), "info");
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "ratewatch",
            "-m",
            "5.0",
            "-t",
            "4",
            "--timeout",
            "15",
            "--top",
            "20",
            "--sort",
            "name",
            "--with-labels",
            "--label-filter",
            "job=~api-.*",
            "-e",
            "-p",
            "9100",
            "-u",
            "300",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);

        assert_eq!(config.analysis.min_dpm, 5.0);
        assert_eq!(config.analysis.worker_count, 4);
        assert_eq!(config.backend.timeout_seconds, 15);
        assert_eq!(config.analysis.top_n, Some(20));
        assert_eq!(config.analysis.sort_by, SortKey::Name);
        assert!(config.analysis.with_labels);
        assert_eq!(config.analysis.label_filter.as_deref(), Some("job=~api-.*"));
        assert!(cli.exporter);
        assert_eq!(config.exporter.port, 9100);
        assert_eq!(config.exporter.refresh_interval_seconds, 300);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["ratewatch", "-q", "-v"]).is_err());
    }

    #[test]
    fn verbosity_maps_to_directives() {
        assert_eq!(Cli::parse_from(["ratewatch", "-q"]).log_directive(), "error");
        assert_eq!(Cli::parse_from(["ratewatch", "-v"]).log_directive(), "debug");
    }
}
