//! One-shot report writers.
//!
//! Each format writes a single `metric_rates.<ext>` file into the target
//! directory. The `prom` format reuses the exporter registry so a one-shot
//! file and a scraped endpoint expose identical gauge families.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ratewatch_domain::{CycleReport, RateWatchError, Result};
use ratewatch_infra::ExporterMetrics;
use serde_json::json;

use crate::cli::OutputFormat;

const REPORT_BASENAME: &str = "metric_rates";

/// Write the report in the requested format and return the file path.
///
/// # Errors
/// Returns `RateWatchError::Internal` if rendering or writing fails.
pub fn write_report(format: OutputFormat, report: &CycleReport, dir: &Path) -> Result<PathBuf> {
    let contents = render(format, report)?;
    let path = dir.join(format!("{REPORT_BASENAME}.{}", format.extension()));
    std::fs::write(&path, contents).map_err(|e| {
        RateWatchError::Internal(format!("failed to write {}: {e}", path.display()))
    })?;
    Ok(path)
}

fn render(format: OutputFormat, report: &CycleReport) -> Result<String> {
    match format {
        OutputFormat::Csv => Ok(render_csv(report)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Prom => render_prom(report),
    }
}

fn render_csv(report: &CycleReport) -> String {
    let enriched = report.results.iter().any(|r| r.active_series.is_some());

    let mut out = String::new();
    if enriched {
        out.push_str("metric_name,dpm,active_series,impact_score\n");
    } else {
        out.push_str("metric_name,dpm\n");
    }

    for result in &report.results {
        if enriched {
            let _ = writeln!(
                out,
                "{},{:.2},{},{:.2}",
                result.name,
                result.dpm,
                result.active_series.unwrap_or(0),
                result.impact_score.unwrap_or(0.0),
            );
        } else {
            let _ = writeln!(out, "{},{:.2}", result.name, result.dpm);
        }
    }
    out
}

fn render_json(report: &CycleReport) -> Result<String> {
    let document = json!({
        "generated_at": report.finished_at,
        "total_metrics_above_threshold": report.results.len(),
        "metrics": report.results,
        "failures": report.failures,
        "performance": report.stats,
    });
    serde_json::to_string_pretty(&document)
        .map_err(|e| RateWatchError::Internal(format!("failed to encode JSON report: {e}")))
}

fn render_text(report: &CycleReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Metric DPM report ({})", report.finished_at.to_rfc3339());
    let _ = writeln!(
        out,
        "discovered: {}  filtered out: {}  evaluated: {}  failed: {}  runtime: {:.2}s",
        report.stats.discovered,
        report.stats.filtered_out,
        report.stats.succeeded,
        report.stats.failed,
        report.stats.total_runtime_seconds,
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<60} {:>12}", "METRIC", "DPM");

    for result in &report.results {
        let _ = write!(out, "{:<60} {:>12.2}", result.name, result.dpm);
        if let (Some(series), Some(impact)) = (result.active_series, result.impact_score) {
            let _ = write!(out, "  series={series} impact={impact:.2}");
        }
        let _ = writeln!(out);
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Failed metrics:");
        for failure in &report.failures {
            let _ = writeln!(
                out,
                "  {} ({}, {} attempts)",
                failure.metric, failure.kind, failure.attempts
            );
        }
    }
    out
}

fn render_prom(report: &CycleReport) -> Result<String> {
    ExporterMetrics::new()?.render_report(report)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ratewatch_domain::{CycleStats, FailureKind, FailureRecord, MetricRateResult};

    use super::*;

    fn report() -> CycleReport {
        CycleReport {
            results: vec![
                MetricRateResult::new("http_requests_total", 120.5),
                MetricRateResult::new("queue_depth", 3.0).with_active_series(12),
            ],
            failures: vec![FailureRecord {
                metric: "broken_metric".into(),
                kind: FailureKind::Timeout,
                attempts: 3,
            }],
            started_at: Utc::now(),
            finished_at: Utc::now(),
            stats: CycleStats::derive(10, 5, 2, 1, 6.0),
        }
    }

    #[test]
    fn csv_includes_enrichment_columns_when_present() {
        let csv = render_csv(&report());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("metric_name,dpm,active_series,impact_score"));
        assert_eq!(lines.next(), Some("http_requests_total,120.50,0,0.00"));
        assert_eq!(lines.next(), Some("queue_depth,3.00,12,36.00"));
    }

    #[test]
    fn csv_is_two_columns_without_enrichment() {
        let mut plain = report();
        plain.results = vec![MetricRateResult::new("up", 1.0)];
        let csv = render_csv(&plain);
        assert_eq!(csv, "metric_name,dpm\nup,1.00\n");
    }

    #[test]
    fn json_document_carries_counts_and_performance() {
        let encoded = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["total_metrics_above_threshold"], 2);
        assert_eq!(value["metrics"][0]["name"], "http_requests_total");
        assert_eq!(value["metrics"][1]["active_series"], 12);
        assert_eq!(value["failures"][0]["metric"], "broken_metric");
        assert_eq!(value["performance"]["failed"], 1);
        // Absent enrichment fields are omitted, not null.
        assert!(value["metrics"][0].get("active_series").is_none());
    }

    #[test]
    fn text_report_lists_results_and_failures() {
        let text = render_text(&report());
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("120.50"));
        assert!(text.contains("series=12 impact=36.00"));
        assert!(text.contains("broken_metric"));
    }

    #[test]
    fn prom_report_matches_exposition_format() {
        let prom = render_prom(&report()).unwrap();
        assert!(prom.contains("metric_dpm_rate{metric_name=\"http_requests_total\"} 120.5"));
        assert!(prom.contains("ratewatch_metrics_failed 1"));
    }

    #[test]
    fn write_report_places_file_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(OutputFormat::Json, &report(), dir.path()).unwrap();
        assert_eq!(path, dir.path().join("metric_rates.json"));
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("http_requests_total"));
    }
}
